use anyhow::{Context, Result, bail};
use content::{ProductDescriptor, ProductEntry, SelectionReport, TierComposer};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

pub fn decide(composer: &TierComposer, tier: &str, products: &[String]) -> Result<()> {
    let selector = super::selector(composer, tier)?;

    for text in products {
        let product: ProductDescriptor = text
            .parse()
            .with_context(|| format!("Invalid product '{text}'"))?;
        let decision = selector.decide(&product);
        match decision.matched_rule {
            Some(idx) => println!(
                "{:<4} {product}  (rule {idx}: {})",
                decision.action,
                selector.rules()[idx]
            ),
            None => println!("{:<4} {product}  (no matching rule)", decision.action),
        }
    }
    Ok(())
}

pub fn select(composer: &TierComposer, tier: &str, input: Option<&Path>, json: bool) -> Result<()> {
    let entries = match input {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            read_entries(file)?
        }
        None => read_entries(std::io::stdin().lock())?,
    };
    log::debug!("Read {} candidate products", entries.len());

    let selector = super::selector(composer, tier)?;
    let report = SelectionReport::build(tier, &selector, &entries);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

/// Read `<product> [bytes]` lines; blank lines and `#` comments are skipped.
pub fn read_entries(reader: impl Read) -> Result<Vec<ProductEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.context("Failed to read product list")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry = parse_entry(line).with_context(|| format!("Line {}: '{line}'", idx + 1))?;
        entries.push(entry);
    }
    Ok(entries)
}

fn parse_entry(line: &str) -> Result<ProductEntry> {
    let mut fields = line.split_whitespace();
    let Some(name) = fields.next() else {
        bail!("missing product name");
    };
    let product: ProductDescriptor = name.parse()?;

    let size_bytes = match fields.next() {
        Some(size) => {
            let bytes = size
                .parse::<u64>()
                .with_context(|| format!("invalid size '{size}'"))?;
            Some(bytes)
        }
        None => None,
    };

    if let Some(extra) = fields.next() {
        bail!("unexpected field '{extra}'");
    }
    Ok(ProductEntry::new(product, size_bytes))
}
