use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;

const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

/// Conditions that stop the server before it binds.
#[derive(Debug, thiserror::Error)]
pub enum FatalConfigError {
    #[error("PLACEMENT_JWT_SECRET is unset or still a placeholder")]
    JwtSecret,

    #[error("{name}: '{value}' is not a valid value")]
    Invalid { name: &'static str, value: String },

    #[error("PLACEMENT_ADMIN_EMAIL and PLACEMENT_ADMIN_PASSWORD must be set together")]
    PartialAdmin,
}

/// Account created at startup when no user with that email exists yet.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: TimeDelta,
    pub upload_dir: PathBuf,
    pub public_url: String,
    pub reconcile_interval: Duration,
    pub sweep_timeout: Duration,
    pub otp_ttl: TimeDelta,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Config {
    pub fn from_env() -> Result<Self, FatalConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, FatalConfigError> {
        let text = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        let jwt_secret = lookup("PLACEMENT_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(FatalConfigError::JwtSecret);
        }

        Ok(Self {
            host: text("PLACEMENT_HOST", "0.0.0.0"),
            port: parse(&lookup, "PLACEMENT_PORT", 3000)?,
            db_path: text("PLACEMENT_DB_PATH", "placement.db").into(),
            jwt_secret,
            token_ttl: span(&lookup, "PLACEMENT_TOKEN_TTL_DAYS", 30, TimeDelta::try_days)?,
            upload_dir: text("PLACEMENT_UPLOAD_DIR", "./uploads").into(),
            public_url: text("PLACEMENT_PUBLIC_URL", "http://localhost:3000/files"),
            reconcile_interval: Duration::from_secs(positive(
                &lookup,
                "PLACEMENT_RECONCILE_INTERVAL_SECS",
                300,
            )?),
            sweep_timeout: Duration::from_secs(positive(&lookup, "PLACEMENT_SWEEP_TIMEOUT_SECS", 10)?),
            otp_ttl: span(&lookup, "PLACEMENT_OTP_TTL_MINUTES", 15, TimeDelta::try_minutes)?,
            bootstrap_admin: bootstrap_admin(&lookup)?,
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, FatalConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| FatalConfigError::Invalid { name, value }),
    }
}

/// Interval-style settings; zero would spin the reconciler.
fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, FatalConfigError> {
    match parse(lookup, name, default)? {
        0 => Err(FatalConfigError::Invalid {
            name,
            value: "0".into(),
        }),
        secs => Ok(secs),
    }
}

/// A positive span built by `make`, which returns `None` when out of range.
fn span(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: i64,
    make: fn(i64) -> Option<TimeDelta>,
) -> Result<TimeDelta, FatalConfigError> {
    let amount: i64 = parse(lookup, name, default)?;
    if amount <= 0 {
        return Err(FatalConfigError::Invalid {
            name,
            value: amount.to_string(),
        });
    }
    make(amount).ok_or_else(|| FatalConfigError::Invalid {
        name,
        value: amount.to_string(),
    })
}

fn bootstrap_admin(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<BootstrapAdmin>, FatalConfigError> {
    let set = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    match (set("PLACEMENT_ADMIN_EMAIL"), set("PLACEMENT_ADMIN_PASSWORD")) {
        (Some(email), Some(password)) => Ok(Some(BootstrapAdmin { email, password })),
        (None, None) => Ok(None),
        _ => Err(FatalConfigError::PartialAdmin),
    }
}
