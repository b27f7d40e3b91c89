//! Runtime configuration from flags, environment and `.env`

use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_DB_PATH: &str = "treino.db";

/// Global options shared by every command
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Base URL of the workout API
    #[arg(long, global = true, env = "TREINO_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Local database holding the login credential
    #[arg(long, global = true, env = "TREINO_DB", default_value = DEFAULT_DB_PATH)]
    pub db: String,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "TREINO_TIMEOUT_SECS", default_value_t = 15)]
    pub timeout_secs: u64,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            bail!("API URL must start with http:// or https://, got {}", self.api_url);
        }
        if self.timeout_secs == 0 {
            bail!("timeout must be at least one second");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: Config,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from(["treino", "--api-url", "https://gym.example", "--timeout-secs", "5"]);
        assert_eq!(cli.config.api_url, "https://gym.example");
        assert_eq!(cli.config.timeout(), Duration::from_secs(5));
        assert!(cli.config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let cli = TestCli::parse_from(["treino", "--api-url", "localhost:3000"]);
        assert!(cli.config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let cli = TestCli::parse_from(["treino", "--timeout-secs", "0"]);
        assert!(cli.config.validate().is_err());
    }
}
