use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

/// HTTP read API.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// UDP event listener.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    pub host: String,
    #[serde(default = "default_ingest_port")]
    pub port: u16,
    /// Events buffered between the listener and the aggregator before the listener waits.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_ingest_port() -> u16 {
    8686
}

fn default_queue_capacity() -> usize {
    4096
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// How often to log collector stats (events, snapshots written/failed) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval_ms(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

fn default_flush_interval_ms() -> u64 {
    10_000
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Interval length used when a read omits `start`.
    #[serde(default = "default_window_secs")]
    pub default_window_secs: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_window_secs: default_window_secs(),
        }
    }
}

fn default_window_secs() -> u64 {
    86_400
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(!self.ingest.host.is_empty(), "ingest.host must be non-empty");
        anyhow::ensure!(
            self.ingest.port > 0,
            "ingest.port must be between 1 and 65535, got {}",
            self.ingest.port
        );
        anyhow::ensure!(
            self.ingest.queue_capacity > 0,
            "ingest.queue_capacity must be > 0, got {}",
            self.ingest.queue_capacity
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.aggregation.flush_interval_ms > 0,
            "aggregation.flush_interval_ms must be > 0, got {}",
            self.aggregation.flush_interval_ms
        );
        anyhow::ensure!(
            self.aggregation.stats_log_interval_secs > 0,
            "aggregation.stats_log_interval_secs must be > 0, got {}",
            self.aggregation.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.query.default_window_secs > 0,
            "query.default_window_secs must be > 0, got {}",
            self.query.default_window_secs
        );
        Ok(())
    }
}
