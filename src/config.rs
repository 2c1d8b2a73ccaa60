use clap::Parser;

/// NBA betting-insights backend
#[derive(Parser, Debug, Clone)]
#[command(name = "nba-edge", version, about)]
pub struct Config {
    /// HTTP listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "nba_edge.db")]
    pub database_path: String,

    /// Gemini API key (callers may also pass their own per request)
    #[arg(long, env = "GEMINI_API_KEY")]
    pub gemini_api_key: Option<String>,

    /// Gemini API base URL
    #[arg(
        long,
        env = "GEMINI_API_URL",
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub gemini_api_url: String,

    /// Gemini model
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.0-flash")]
    pub gemini_model: String,

    /// the-odds-api.com API key (source disabled when absent)
    #[arg(long, env = "ODDS_API_KEY")]
    pub odds_api_key: Option<String>,

    /// Override the-odds-api base URL
    #[arg(long, env = "ODDS_API_URL")]
    pub odds_api_url: Option<String>,

    /// Override ESPN site API base URL
    #[arg(long, env = "ESPN_API_URL")]
    pub espn_api_url: Option<String>,

    /// Override DraftKings API base URL
    #[arg(long, env = "DRAFTKINGS_API_URL")]
    pub draftkings_api_url: Option<String>,

    /// Override PrizePicks API base URL
    #[arg(long, env = "PRIZEPICKS_API_URL")]
    pub prizepicks_api_url: Option<String>,

    /// Use Gemini search grounding as a last-resort lines source
    #[arg(long, env = "GEMINI_LINES", default_value = "false")]
    pub gemini_lines: bool,

    /// Scoreboard polling interval in seconds
    #[arg(long, env = "SCOREBOARD_POLL_SECS", default_value = "30")]
    pub scoreboard_poll_secs: u64,

    /// Betting-lines polling interval in seconds
    #[arg(long, env = "ODDS_POLL_SECS", default_value = "60")]
    pub odds_poll_secs: u64,

    /// Standings/injuries/props polling interval in seconds
    #[arg(long, env = "SLATE_POLL_SECS", default_value = "300")]
    pub slate_poll_secs: u64,

    /// Days to keep persisted odds snapshots
    #[arg(long, env = "SNAPSHOT_RETENTION_DAYS", default_value = "7")]
    pub snapshot_retention_days: u32,

    /// Directory holding the production frontend build (served when present)
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scoreboard_poll_secs == 0 || self.odds_poll_secs == 0 || self.slate_poll_secs == 0
        {
            anyhow::bail!("poll intervals must be positive");
        }
        if self.snapshot_retention_days == 0 {
            anyhow::bail!("snapshot_retention_days must be positive");
        }

        url::Url::parse(&self.gemini_api_url)
            .map_err(|e| anyhow::anyhow!("invalid GEMINI_API_URL: {}", e))?;
        for (name, value) in [
            ("ODDS_API_URL", &self.odds_api_url),
            ("ESPN_API_URL", &self.espn_api_url),
            ("DRAFTKINGS_API_URL", &self.draftkings_api_url),
            ("PRIZEPICKS_API_URL", &self.prizepicks_api_url),
        ] {
            if let Some(value) = value {
                url::Url::parse(value)
                    .map_err(|e| anyhow::anyhow!("invalid {}: {}", name, e))?;
            }
        }

        if self.gemini_lines && self.gemini_api_key.as_deref().unwrap_or("").is_empty() {
            anyhow::bail!("GEMINI_LINES requires GEMINI_API_KEY to be set");
        }
        Ok(())
    }
}
