//! Service configuration.

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/z-cohort").
    pub data_dir: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Seed for the distribution RNG. Unset means seeded from OS entropy.
    /// A fixed seed makes the sequence of distributions reproducible.
    pub distribution_seed: Option<u64>,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: parse_env("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parse_env("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            distribution_seed: parse_env("DISTRIBUTION_SEED"),
        }
    }
}

/// Read and parse an environment variable, ignoring unset or malformed values.
fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring malformed environment variable");
            None
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/z-cohort".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024, // 1MB
            request_timeout_seconds: 30,
            distribution_seed: None,
        }
    }
}
