use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use once_cell::sync::OnceCell;

pub static CONFIG: OnceCell<Configuration> = OnceCell::new();

/// Default configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "eventcontent.toml";

/// Prefix of environment overrides, e.g. `EVENTCONTENT__CONTENT__DEFAULT_TIER`.
pub const ENV_PREFIX: &str = "EVENTCONTENT__";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Path of the block and tier declarations
    pub definitions: PathBuf,
    /// Tier used when a command does not name one
    pub default_tier: Option<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            definitions: PathBuf::from("config/event_content.toml"),
            default_tier: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `content=debug`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    pub content: ContentConfig,
    pub logging: LoggingConfig,
}

impl Configuration {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(CONFIG_FILE))
            .extract()
            .map_err(Box::new)
    }

    /// Like [`load`](Self::load) but reads `path` instead of the default file.
    /// A missing file is an error here.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        if !path.exists() {
            return Err(Box::new(figment::Error::from(format!(
                "configuration file {} not found",
                path.display()
            ))));
        }
        Self::figment(Toml::file(path)).extract().map_err(Box::new)
    }

    fn figment(file: figment::providers::Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Tier to use when none was given explicitly.
    pub fn resolve_tier(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.content.default_tier.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();

        assert_eq!(
            config.content.definitions,
            PathBuf::from("config/event_content.toml")
        );
        assert!(config.content.default_tier.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_configless_operation() {
        Jail::expect_with(|_jail| {
            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(
                config.content.definitions,
                PathBuf::from("config/event_content.toml")
            );
            assert_eq!(config.logging.level, "info");
            Ok(())
        });
    }

    #[test]
    fn test_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [content]
                definitions = "tiers/custom.toml"
                default_tier = "AODSIM"
                "#,
            )?;

            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(
                config.content.definitions,
                PathBuf::from("tiers/custom.toml")
            );
            assert_eq!(config.content.default_tier.as_deref(), Some("AODSIM"));
            assert_eq!(config.logging.level, "info");
            Ok(())
        });
    }

    #[test]
    fn test_env_var_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [content]
                default_tier = "RECO"
                "#,
            )?;
            jail.set_env("EVENTCONTENT__CONTENT__DEFAULT_TIER", "FEVT");
            jail.set_env("EVENTCONTENT__LOGGING__LEVEL", "content=debug");

            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(config.content.default_tier.as_deref(), Some("FEVT"));
            assert_eq!(config.logging.level, "content=debug");
            Ok(())
        });
    }

    #[test]
    fn test_load_from_path() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "other.toml",
                r#"
                [logging]
                level = "warn"
                "#,
            )?;

            let config = Configuration::load_from_path(Path::new("other.toml")).map_err(|e| *e)?;
            assert_eq!(config.logging.level, "warn");

            let missing = Configuration::load_from_path(Path::new("absent.toml"));
            assert!(missing.is_err());
            Ok(())
        });
    }

    #[test]
    fn test_resolve_tier() {
        let mut config = Configuration::default();
        assert_eq!(config.resolve_tier(None), None);
        assert_eq!(config.resolve_tier(Some("RAW")).as_deref(), Some("RAW"));

        config.content.default_tier = Some(String::from("AOD"));
        assert_eq!(config.resolve_tier(None).as_deref(), Some("AOD"));
        assert_eq!(config.resolve_tier(Some("RAW")).as_deref(), Some("RAW"));
    }
}
