//! Configuration management for the Repit server
//!
//! Values are layered: `conf/application.yml`, then `REPIT_`-prefixed
//! environment variables, then command line flags.

use std::time::Duration;

use clap::Parser;
use config::{Config, Environment};

use repit_gamification::ExponentialCurve;
use repit_gamification::leveling::{DEFAULT_BASE_XP, DEFAULT_MAX_LEVEL, DEFAULT_MULTIPLIER};

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
pub const DEFAULT_SERVER_PORT: u16 = 8008;
pub const DEFAULT_LEADERBOARD_CACHE_TTL_SECS: u64 = 60;

const SERVER_ADDRESS: &str = "server.address";
const SERVER_PORT: &str = "server.port";
const DB_URL: &str = "db.url";
const VERSION: &str = "repit.version";
const LOG_PATH: &str = "repit.logs.path";
const LOG_CONSOLE: &str = "repit.logs.console";
const LOG_FILE: &str = "repit.logs.file";
const LOG_LEVEL: &str = "repit.logs.level";
const BASE_XP: &str = "repit.gamification.base_xp";
const MULTIPLIER: &str = "repit.gamification.multiplier";
const MAX_LEVEL: &str = "repit.gamification.max_level";
const LEADERBOARD_CACHE_TTL: &str = "repit.gamification.leaderboard_cache_ttl_secs";
const SEED_DEFAULTS: &str = "repit.gamification.seed_defaults";
const REPORT_LAYOUT: &str = "repit.analytics.report_layout";

/// Command line arguments for the server
#[derive(Debug, Default, Parser)]
#[command(name = "repit-server", version)]
pub struct Cli {
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
    #[arg(long = "db-url", env = "DATABASE_URL")]
    pub database_url: Option<String>,
    #[arg(long = "log-dir")]
    pub log_dir: Option<String>,
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Build from the process arguments
    pub fn new() -> anyhow::Result<Self> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(args: Cli) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .add_source(config::File::with_name(&args.config_file).required(false))
            .add_source(
                Environment::with_prefix("repit")
                    .prefix_separator("_")
                    .separator(".")
                    .try_parsing(true),
            );

        if let Some(port) = args.port {
            builder = builder.set_override(SERVER_PORT, i64::from(port))?;
        }
        if let Some(url) = args.database_url {
            builder = builder.set_override(DB_URL, url)?;
        }
        if let Some(dir) = args.log_dir {
            builder = builder.set_override(LOG_PATH, dir)?;
        }

        Ok(Configuration {
            config: builder.build()?,
        })
    }

    // ========================================================================
    // Server
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string(SERVER_ADDRESS)
            .unwrap_or("0.0.0.0".to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int(SERVER_PORT)
            .ok()
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    pub fn version(&self) -> String {
        self.config
            .get_string(VERSION)
            .unwrap_or(env!("CARGO_PKG_VERSION").to_string())
    }

    /// External database URL; `None` selects the embedded store
    pub fn database_url(&self) -> Option<String> {
        self.config
            .get_string(DB_URL)
            .ok()
            .filter(|url| !url.trim().is_empty())
    }

    // ========================================================================
    // Logging
    // ========================================================================

    pub fn log_dir(&self) -> Option<String> {
        self.config
            .get_string(LOG_PATH)
            .ok()
            .filter(|dir| !dir.is_empty())
    }

    pub fn log_console(&self) -> bool {
        self.config.get_bool(LOG_CONSOLE).unwrap_or(true)
    }

    pub fn log_file(&self) -> bool {
        self.config.get_bool(LOG_FILE).unwrap_or(true)
    }

    pub fn log_level(&self) -> String {
        self.config
            .get_string(LOG_LEVEL)
            .unwrap_or("info".to_string())
    }

    // ========================================================================
    // Gamification
    // ========================================================================

    pub fn leveling_curve(&self) -> ExponentialCurve {
        ExponentialCurve::new(
            self.config.get_int(BASE_XP).unwrap_or(DEFAULT_BASE_XP),
            self.config.get_float(MULTIPLIER).unwrap_or(DEFAULT_MULTIPLIER),
            self.config
                .get_int(MAX_LEVEL)
                .ok()
                .and_then(|l| i32::try_from(l).ok())
                .unwrap_or(DEFAULT_MAX_LEVEL),
        )
    }

    pub fn leaderboard_cache_ttl(&self) -> Duration {
        let secs = self
            .config
            .get_int(LEADERBOARD_CACHE_TTL)
            .ok()
            .and_then(|s| u64::try_from(s).ok())
            .unwrap_or(DEFAULT_LEADERBOARD_CACHE_TTL_SECS);
        Duration::from_secs(secs)
    }

    /// Seed default achievements and badges at startup
    pub fn seed_defaults(&self) -> bool {
        self.config.get_bool(SEED_DEFAULTS).unwrap_or(true)
    }

    // ========================================================================
    // Analytics
    // ========================================================================

    /// Path to an HTML layout replacing the built-in report page
    pub fn report_layout_path(&self) -> Option<String> {
        self.config
            .get_string(REPORT_LAYOUT)
            .ok()
            .filter(|path| !path.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn from_yaml(yaml: &str, args: Cli) -> Configuration {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        Configuration::from_cli(Cli {
            config_file: file.path().to_string_lossy().to_string(),
            ..args
        })
        .unwrap()
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Configuration::from_cli(Cli {
            config_file: "/nonexistent/application.yml".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(config.server_address(), "0.0.0.0");
        assert_eq!(config.server_port(), DEFAULT_SERVER_PORT);
        assert!(config.database_url().is_none());
        assert_eq!(config.leveling_curve(), ExponentialCurve::default());
        assert_eq!(config.leaderboard_cache_ttl(), Duration::from_secs(60));
        assert!(config.seed_defaults());
    }

    #[test]
    fn test_file_values() {
        let config = from_yaml(
            r#"
server:
  port: 9100
db:
  url: ""
repit:
  version: "2.0.0"
  logs:
    console: false
    level: debug
  gamification:
    base_xp: 500
    multiplier: 2.0
    max_level: 50
    leaderboard_cache_ttl_secs: 5
"#,
            Cli::default(),
        );

        assert_eq!(config.server_port(), 9100);
        assert!(config.database_url().is_none());
        assert_eq!(config.version(), "2.0.0");
        assert!(!config.log_console());
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.leveling_curve(), ExponentialCurve::new(500, 2.0, 50));
        assert_eq!(config.leaderboard_cache_ttl(), Duration::from_secs(5));
    }

    #[test]
    fn test_cli_overrides_file() {
        let config = from_yaml(
            "server:\n  port: 9100\n",
            Cli {
                port: Some(9200),
                database_url: Some("postgres://localhost/repit".to_string()),
                log_dir: Some("/tmp/repit-logs".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(config.server_port(), 9200);
        assert_eq!(
            config.database_url().as_deref(),
            Some("postgres://localhost/repit")
        );
        assert_eq!(config.log_dir().as_deref(), Some("/tmp/repit-logs"));
    }
}
