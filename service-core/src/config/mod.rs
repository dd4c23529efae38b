use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Loads `.env`, an optional `configuration` file and `APP__*` variables.
    ///
    /// A bare `PORT` variable overrides the listening port so the service can
    /// run under platforms that only inject `PORT`.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mut config: Config = config.try_deserialize()?;

        if let Ok(port) = std::env::var("PORT") {
            config.port = port.parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid PORT {:?}: {}", port, e))
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_to_3000() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn explicit_port_is_kept() {
        let config: Config = serde_json::from_str(r#"{"port": 8088}"#).unwrap();
        assert_eq!(config.port, 8088);
    }
}
