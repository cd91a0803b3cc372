use anyhow::Result;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the fleet backend.
    pub api_base: String,
    /// Card grid refresh period.
    pub cards_interval_secs: u64,
    /// Ticker window advance period.
    pub ticker_window_secs: u64,
    /// Columns the ticker scrolls per frame.
    pub ticker_scroll_speed: u16,
    /// Draw/event loop frame budget.
    pub frame_ms: u64,
    /// Per-request HTTP timeout. The source dashboard had none; a hung
    /// request here only stalls its own poll cycle, but not forever.
    pub http_timeout_secs: u64,
    /// Log file path (the terminal owns stdout).
    pub log_path: String,
    /// Base tracing filter.
    pub log_filter: String,
}

impl Config {
    /// Load config from a specific .env file, or the default `.env` if None.
    pub fn from_env_file(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => {
                dotenvy::from_filename(p).ok();
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Self::build_from_env()
    }

    fn build_from_env() -> Result<Self> {
        Ok(Self {
            api_base: env("API_BASE", "http://localhost:8000"),
            cards_interval_secs: env("CARDS_INTERVAL_SECS", "10").parse().unwrap_or(10),
            ticker_window_secs: env("TICKER_WINDOW_SECS", "2").parse().unwrap_or(2),
            ticker_scroll_speed: env("TICKER_SCROLL_SPEED", "1").parse().unwrap_or(1),
            frame_ms: env("FRAME_MS", "50").parse().unwrap_or(50),
            http_timeout_secs: env("HTTP_TIMEOUT_SECS", "15").parse().unwrap_or(15),
            log_path: env("LOG_PATH", "minerdash.log"),
            log_filter: env("LOG_FILTER", "info"),
        })
    }
}

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
