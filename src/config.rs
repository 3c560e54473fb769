use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// FUNews management server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "funews-server", version, about = "FUNews management server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "FUNEWS_PORT", default_value = "8080")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "FUNEWS_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./funews.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "FUNEWS_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (DB)
    #[arg(long, env = "FUNEWS_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Email for the seeded admin account (created on first boot)
    #[arg(long, env = "FUNEWS_ADMIN_EMAIL", default_value = "admin@funews.org")]
    pub admin_email: String,

    /// Password for the seeded admin account
    #[arg(long, env = "FUNEWS_ADMIN_PASSWORD", default_value = "admin123")]
    pub admin_password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            config: "./funews.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            admin_email: "admin@funews.org".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (FUNEWS_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("FUNEWS_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# FUNews Management Server Configuration
# Place this file at ./funews.toml or specify with --config <path>
# All settings can be overridden via environment variables (FUNEWS_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 8080)
# port = 8080

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite database
# data_dir = "./data"

# Seeded admin account, created on first boot if absent
# admin_email = "admin@funews.org"
# admin_password = "admin123"
"#
    .to_string()
}
