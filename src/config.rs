use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parley conversation server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "parley-server", version, about = "Parley real-time conversation server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PARLEY_PORT", default_value = "5000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "PARLEY_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./parley.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "PARLEY_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for the conversation database
    #[arg(long, env = "PARLEY_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Upper bound on the conversation lookup that gates joins and sends
    #[arg(long, env = "PARLEY_LOOKUP_TIMEOUT_SECS", default_value = "8")]
    pub lookup_timeout_secs: u64,

    /// Interval between server pings on each connection
    #[arg(long, env = "PARLEY_PING_INTERVAL_SECS", default_value = "25")]
    pub ping_interval_secs: u64,

    /// Close a connection when no pong arrived for this long
    #[arg(long, env = "PARLEY_PONG_TIMEOUT_SECS", default_value = "60")]
    pub pong_timeout_secs: u64,

    /// Handshake verification (loaded from [auth] section in TOML)
    #[arg(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

/// How the WebSocket handshake identifies the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Trust the `userId` query parameter
    #[default]
    Trusted,
    /// Require an HS256 JWT in the `token` query parameter
    Jwt,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,

    /// Shared secret for `jwt` mode
    #[serde(default)]
    pub jwt_secret: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_address: "0.0.0.0".to_string(),
            config: "./parley.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            lookup_timeout_secs: 8,
            ping_interval_secs: 25,
            pong_timeout_secs: 60,
            auth: None,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (PARLEY_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("PARLEY_").split("__"))
            .merge(Serialized::defaults(cli))
            .extract()
    }

    pub fn auth(&self) -> AuthConfig {
        self.auth.clone().unwrap_or_default()
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    /// A zero ping interval is raised to one second; tokio intervals must be non-zero.
    pub fn keepalive(&self) -> Keepalive {
        Keepalive {
            ping_interval: Duration::from_secs(self.ping_interval_secs.max(1)),
            pong_timeout: Duration::from_secs(self.pong_timeout_secs),
        }
    }
}

/// Transport liveness settings for each connection actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
}

impl Default for Keepalive {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(25),
            pong_timeout: Duration::from_secs(60),
        }
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Parley Conversation Server Configuration
# Place this file at ./parley.toml or specify with --config <path>
# All settings can be overridden via environment variables (PARLEY_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 5000)
# port = 5000

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite conversation database
# data_dir = "./data"

# Timeout for the conversation lookup that gates joins (seconds)
# lookup_timeout_secs = 8

# Transport keepalive: ping interval and pong timeout (seconds)
# ping_interval_secs = 25
# pong_timeout_secs = 60

# ---- Handshake ----
# [auth]
# "trusted": accept the userId query parameter as-is
# "jwt": require ?token=<HS256 JWT>, identity taken from the sub claim
# mode = "trusted"
# jwt_secret = ""
"#
    .to_string()
}
