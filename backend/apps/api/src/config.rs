//! Server configuration, read once from the environment at startup.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use platform::rate_limit::{EveryNthCall, RandomSweep, RateLimitTable, SweepPolicy};
use platform::token::SessionSecret;
use tutor::infra::openai::DEFAULT_REALTIME_MODEL;

pub const JWT_SECRET: &str = "JWT_SECRET";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

/// How expired rate-limit entries are cleaned up
#[derive(Debug, Clone, PartialEq)]
pub enum SweepMode {
    /// Sweep inline on a random fraction of requests
    Random,
    /// Sweep inline on every n-th request
    EveryNth(u64),
    /// Sweep from a background task
    Interval(Duration),
}

impl SweepMode {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("random") {
            return Ok(SweepMode::Random);
        }
        if let Some(n) = raw.strip_prefix("every:") {
            let n = n.parse().context("RATE_LIMIT_SWEEP every:<n> needs an integer")?;
            return Ok(SweepMode::EveryNth(n));
        }
        if let Some(secs) = raw.strip_prefix("interval:") {
            let secs: u64 = secs
                .parse()
                .context("RATE_LIMIT_SWEEP interval:<secs> needs an integer")?;
            if secs == 0 {
                bail!("RATE_LIMIT_SWEEP interval must be at least 1 second");
            }
            return Ok(SweepMode::Interval(Duration::from_secs(secs)));
        }
        bail!("RATE_LIMIT_SWEEP must be random, every:<n> or interval:<secs>, got {raw:?}")
    }

    /// Inline policy for the limiter. Interval mode never sweeps inline.
    pub fn inline_policy(&self) -> Option<Arc<dyn SweepPolicy>> {
        match self {
            SweepMode::Random => Some(Arc::new(RandomSweep::default())),
            SweepMode::EveryNth(n) => Some(Arc::new(EveryNthCall::new(*n))),
            SweepMode::Interval(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub session_secret: SessionSecret,
    pub database_url: String,
    pub openai_api_key: String,
    pub realtime_model: String,
    pub password_pepper: Option<Vec<u8>>,
    pub rate_limits: RateLimitTable,
    pub sweep: SweepMode,
    pub bind_addr: SocketAddr,
    pub frontend_origins: Vec<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("realtime_model", &self.realtime_model)
            .field("rate_limits", &self.rate_limits)
            .field("sweep", &self.sweep)
            .field("bind_addr", &self.bind_addr)
            .field("frontend_origins", &self.frontend_origins)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let session_secret = SessionSecret::from_env(JWT_SECRET)?;
        Self::from_lookup(session_secret, |key| env::var(key).ok())
    }

    /// Build from any key-value source.
    pub fn from_lookup<F>(session_secret: SessionSecret, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required =
            |key: &str| optional(key).with_context(|| format!("{key} must be set in environment"));

        let rate_limits = match optional("RATE_LIMITS") {
            Some(json) => RateLimitTable::from_json(&json)?,
            None => RateLimitTable::default(),
        };

        let sweep = match optional("RATE_LIMIT_SWEEP") {
            Some(raw) => SweepMode::parse(&raw)?,
            None => SweepMode::Random,
        };

        let bind_addr = optional("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR must be host:port")?;

        let frontend_origins = optional("FRONTEND_ORIGINS")
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            session_secret,
            database_url: required("DATABASE_URL")?,
            openai_api_key: required("OPENAI_API_KEY")?,
            realtime_model: optional("REALTIME_MODEL")
                .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
            password_pepper: optional("PASSWORD_PEPPER").map(String::into_bytes),
            rate_limits,
            sweep,
            bind_addr,
            frontend_origins,
        })
    }
}
