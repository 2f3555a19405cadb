//! Selection summaries for a tier over a set of candidate products.

use crate::resolver::{Decision, ProductSelector};
use crate::rule::ProductDescriptor;
use serde::Serialize;
use std::cmp::Reverse;
use std::fmt;

/// A candidate product with its persisted size, when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductEntry {
    pub product: ProductDescriptor,
    pub size_bytes: Option<u64>,
}

impl ProductEntry {
    pub fn new(product: ProductDescriptor, size_bytes: Option<u64>) -> Self {
        Self {
            product,
            size_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub product: String,
    pub size_bytes: Option<u64>,
    pub decision: Decision,
}

/// Kept and dropped products of one tier, largest first.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionReport {
    pub tier: String,
    pub kept: Vec<ReportLine>,
    pub dropped: Vec<ReportLine>,
}

impl SelectionReport {
    pub fn build(
        tier: impl Into<String>,
        selector: &ProductSelector,
        entries: &[ProductEntry],
    ) -> Self {
        let selection = selector.select(entries, |entry| &entry.product);
        let to_lines = |decided: Vec<(&ProductEntry, Decision)>| {
            let mut lines: Vec<ReportLine> = decided
                .into_iter()
                .map(|(entry, decision)| ReportLine {
                    product: entry.product.to_string(),
                    size_bytes: entry.size_bytes,
                    decision,
                })
                .collect();
            lines.sort_by(|a, b| {
                Reverse(a.size_bytes.unwrap_or(0))
                    .cmp(&Reverse(b.size_bytes.unwrap_or(0)))
                    .then_with(|| a.product.cmp(&b.product))
            });
            lines
        };

        Self {
            tier: tier.into(),
            kept: to_lines(selection.kept),
            dropped: to_lines(selection.dropped),
        }
    }

    pub fn kept_bytes(&self) -> u64 {
        total_bytes(&self.kept)
    }

    pub fn dropped_bytes(&self) -> u64 {
        total_bytes(&self.dropped)
    }
}

/// Sum of known sizes, saturating at `u64::MAX`.
fn total_bytes(lines: &[ReportLine]) -> u64 {
    lines
        .iter()
        .filter_map(|line| line.size_bytes)
        .fold(0, u64::saturating_add)
}

fn write_lines(f: &mut fmt::Formatter<'_>, label: &str, lines: &[ReportLine]) -> fmt::Result {
    writeln!(f, "{label}:")?;
    for line in lines {
        match line.size_bytes {
            Some(size) => writeln!(f, "  {size} bytes : {}", line.product)?,
            None => writeln!(f, "  - bytes : {}", line.product)?,
        }
    }
    Ok(())
}

impl fmt::Display for SelectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} kept, {} dropped",
            self.tier,
            self.kept.len(),
            self.dropped.len()
        )?;
        write_lines(f, "kept", &self.kept)?;
        write_lines(f, "dropped", &self.dropped)?;
        writeln!(f, "total kept size: {} bytes", self.kept_bytes())?;
        write!(f, "total dropped size: {} bytes", self.dropped_bytes())
    }
}
