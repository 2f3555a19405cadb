use anyhow::Context;
use common::cli::utils;
use common::config::Configuration;
use content::TierComposer;

pub fn blocks(composer: &TierComposer) -> anyhow::Result<()> {
    for block in composer.registry().blocks() {
        println!("{:<28} {:>3} rules", block.name(), block.len());
    }
    Ok(())
}

pub fn tiers(composer: &TierComposer) -> anyhow::Result<()> {
    for name in composer.tiers() {
        let rules = composer.composed_rules(name)?;
        let parent = composer
            .tier(name)
            .and_then(|tier| tier.parent())
            .unwrap_or("-");
        println!("{name:<14} parent: {parent:<10} {:>4} rules", rules.len());
    }
    Ok(())
}

pub fn describe(composer: &TierComposer, tier: &str, json: bool) -> anyhow::Result<()> {
    let traced = composer
        .describe(tier)
        .with_context(|| format!("Cannot describe tier '{tier}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&traced)?);
        return Ok(());
    }

    for (idx, entry) in traced.iter().enumerate() {
        println!("{idx:>4}  {:<50} {}", entry.rule.to_string(), entry.origin);
    }
    Ok(())
}

/// Compose everything and report `drop *` rules that reset a tier midway.
pub fn validate(config: &Configuration) -> anyhow::Result<()> {
    let composer = utils::validate_config(config)?;

    let mut resets = 0;
    for name in composer.tiers() {
        let traced = composer.describe(name)?;
        for idx in composer.blanket_resets(name)? {
            resets += 1;
            log::warn!(
                "Tier '{name}': rule {idx} from {} drops everything selected before it",
                traced[idx].origin
            );
        }
    }

    println!(
        "{} blocks, {} tiers, {resets} blanket resets",
        composer.registry().len(),
        composer.tiers().len()
    );
    Ok(())
}
