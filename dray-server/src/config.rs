use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host. `API_HOST`, default `0.0.0.0`.
    pub host: String,
    /// Bind port. `API_PORT`, default `3000`.
    pub port: u16,
    /// Worker count. `WORKER_CONCURRENCY`, default `1`.
    pub workers: usize,
    /// Empty-queue poll interval. `WORKER_POLL_MS`, default `100`.
    pub poll_interval: Duration,
    /// Lease duration for dispatched jobs. `LEASE_SECONDS`, default `300`.
    pub lease_duration: Duration,
    /// Attempt budget per job. `MAX_ATTEMPTS`, default `3`.
    pub max_attempts: u32,
    /// First retry delay, doubled per attempt. `RETRY_BASE_MS`, default `1000`.
    pub retry_base_delay: Duration,
    /// Directory for CSV export files. `OUTPUT_DIR`, default `./output`.
    pub output_dir: PathBuf,
    /// SMTP host. `MAIL_HOST`, default `localhost`.
    pub mail_host: String,
    /// SMTP port. `MAIL_PORT`, default `1025`.
    pub mail_port: u16,
    /// Sender address. `MAIL_FROM`, default `noreply@example.com`.
    pub mail_from: String,
}

impl ServerConfig {
    /// Builds the configuration from environment variables, falling back
    /// to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self {
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("API_PORT", 3000),
            workers: env_parse("WORKER_CONCURRENCY", 1),
            poll_interval: Duration::from_millis(env_parse("WORKER_POLL_MS", 100)),
            lease_duration: Duration::from_secs(env_parse("LEASE_SECONDS", 300)),
            max_attempts: env_parse("MAX_ATTEMPTS", 3),
            retry_base_delay: Duration::from_millis(env_parse("RETRY_BASE_MS", 1000)),
            output_dir: PathBuf::from(
                env::var("OUTPUT_DIR").unwrap_or_else(|_| "./output".to_string()),
            ),
            mail_host: env::var("MAIL_HOST").unwrap_or_else(|_| "localhost".to_string()),
            mail_port: env_parse("MAIL_PORT", 1025),
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@example.com".to_string()),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        // Keep in lockstep with the from_env defaults.
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            workers: 1,
            poll_interval: Duration::from_millis(100),
            lease_duration: Duration::from_secs(300),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(1000),
            output_dir: PathBuf::from("./output"),
            mail_host: "localhost".to_string(),
            mail_port: 1025,
            mail_from: "noreply@example.com".to_string(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Ignoring unparseable environment variable");
            default
        }),
        Err(_) => default,
    }
}
