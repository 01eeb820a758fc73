use anyhow::{ensure, Context, Result};

/// Floor for the stale-pending sweep. Above the 10 s send timeout plus the 10 s shorten
/// timeout, so a send still in flight is never swept.
pub const MIN_STALE_PENDING_SECS: u32 = 30;

const DEFAULT_SIMPLETEXTING_BASE_URL: &str = "https://api-app2.simpletexting.com/v2";
const DEFAULT_BITLY_BASE_URL: &str = "https://api-ssl.bitly.com/v4";

/// Application configuration loaded from environment variables.
/// Fails at startup if `DATABASE_URL` is missing or a numeric variable does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub app_env: String,
    pub simpletexting_api_key: Option<String>,
    pub simpletexting_base_url: String,
    /// Explicit `MOCK_SMS` override. Only consulted when an API key is present.
    pub mock_sms: Option<bool>,
    pub mock_sms_delay_ms: u64,
    pub bitly_access_token: Option<String>,
    pub bitly_base_url: String,
    pub stale_pending_secs: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mock_sms = match optional("MOCK_SMS") {
            Some(raw) => Some(parse_bool(&raw).with_context(|| {
                format!("MOCK_SMS must be 'true' or 'false', got '{raw}'")
            })?),
            None => None,
        };

        let stale_pending_secs = optional("STALE_PENDING_SECS")
            .unwrap_or_else(|| "300".to_string())
            .trim()
            .parse::<u32>()
            .context("STALE_PENDING_SECS must be a whole number of seconds")?;
        ensure!(
            stale_pending_secs >= MIN_STALE_PENDING_SECS,
            "STALE_PENDING_SECS must be at least {MIN_STALE_PENDING_SECS}, got {stale_pending_secs}"
        );

        Ok(Config {
            database_url: optional("DATABASE_URL")
                .context("Required environment variable 'DATABASE_URL' is not set")?,
            port: optional("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            app_env: optional("APP_ENV").unwrap_or_else(|| "development".to_string()),
            simpletexting_api_key: optional("SIMPLETEXTING_API_KEY"),
            simpletexting_base_url: optional("SIMPLETEXTING_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SIMPLETEXTING_BASE_URL.to_string()),
            mock_sms,
            mock_sms_delay_ms: optional("MOCK_SMS_DELAY_MS")
                .unwrap_or_else(|| "1000".to_string())
                .parse::<u64>()
                .context("MOCK_SMS_DELAY_MS must be a whole number of milliseconds")?,
            bitly_access_token: optional("BITLY_ACCESS_TOKEN"),
            bitly_base_url: optional("BITLY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BITLY_BASE_URL.to_string()),
            stale_pending_secs,
        })
    }

    /// Age after which a `pending` SMS record is treated as abandoned.
    pub fn stale_pending_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.stale_pending_secs))
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Resolves whether the SMS gateway runs simulated.
    ///
    /// Without an API key there is nothing to send with, so mock mode is forced.
    /// With a key, an explicit `MOCK_SMS` wins; otherwise only production sends for real.
    pub fn sms_mock_mode(&self) -> bool {
        if self.simpletexting_api_key.is_none() {
            return true;
        }
        self.mock_sms.unwrap_or(!self.is_production())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
