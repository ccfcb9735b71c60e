use std::{num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;

pub const DEFAULT_REACTION_KINDS: &[&str] = &["like", "love", "laugh", "wow", "sad", "angry"];

/// File extensions accepted for post preview images
pub const IMAGE_EXTENSIONS: &[&str] = &["gif", "jpeg", "jpg", "png", "svg", "webp"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Process-wide settings, loaded once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_lifetime: Duration,
    /// Lifetime of email verification and password reset tokens.
    pub verification_lifetime: Duration,
    pub reaction_kinds: Vec<String>,
    /// Default page size for post listings; also the upper bound.
    pub api_posts_limit: usize,
    pub text_length_limit: usize,
    pub static_dir: PathBuf,
    pub bcrypt_cost: u32,
    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
    pub login_rate_per_second: NonZeroU32,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let reaction_kinds = match lookup("REACTION_KINDS") {
            Some(raw) => parse_reaction_kinds(&raw)?,
            None => DEFAULT_REACTION_KINDS.iter().map(|k| k.to_string()).collect(),
        };

        let api_posts_limit: usize = parse_or(&lookup, "API_POSTS_LIMIT", 20)?;
        if api_posts_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "API_POSTS_LIMIT",
                value: "0".into(),
            });
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            jwt_secret,
            token_lifetime: Duration::from_secs(parse_or(&lookup, "TOKEN_LIFETIME_SECS", 3600)?),
            verification_lifetime: Duration::from_secs(parse_or(
                &lookup,
                "VERIFICATION_LIFETIME_SECS",
                3600,
            )?),
            reaction_kinds,
            api_posts_limit,
            text_length_limit: parse_or(&lookup, "TEXT_LENGTH_LIMIT", 5000)?,
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            login_rate_per_second: parse_or(
                &lookup,
                "LOGIN_RATE_PER_SECOND",
                NonZeroU32::MIN.saturating_add(4),
            )?,
        })
    }

    pub fn is_reaction_kind(&self, kind: &str) -> bool {
        self.reaction_kinds.iter().any(|k| k == kind)
    }

    /// Directory where uploaded post images are written.
    pub fn post_images_dir(&self) -> PathBuf {
        self.static_dir.join("posts")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_reaction_kinds(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut kinds: Vec<String> = Vec::new();
    for kind in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !kinds.iter().any(|k| k == kind) {
            kinds.push(kind.to_string());
        }
    }

    if kinds.is_empty() {
        return Err(ConfigError::Invalid {
            key: "REACTION_KINDS",
            value: raw.to_string(),
        });
    }

    Ok(kinds)
}
