use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::auth::hash_password;

const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "changeme123";
const DEFAULT_SESSION_SECRET: &str = "memorial-site-secret-key-change-this";

/// Session secrets that are refused when running in production.
const PLACEHOLDER_SECRETS: &[&str] =
    &[DEFAULT_SESSION_SECRET, "change-me-to-a-random-string"];

/// Remote object store settings. When absent, photos are written to
/// `upload_dir` and served under `upload_url_prefix`.
#[derive(Debug, Clone)]
pub struct RemoteBlobConfig {
    pub api_url: String,
    pub token: String,
}

/// Everything the server needs, resolved once at startup and shared through
/// [`crate::AppState`].
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub production: bool,
    /// Reverse proxies in front of the server that append to
    /// `X-Forwarded-For`. Zero ignores the header entirely.
    pub proxy_hops: usize,
    pub allowed_origin: Option<String>,
    pub admin_username: String,
    /// Argon2 PHC string.
    pub admin_password_hash: String,
    pub session_secret: String,
    pub public_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub upload_url_prefix: String,
    pub remote_blob: Option<RemoteBlobConfig>,
}

impl Config {
    /// Development defaults with the given admin credentials. The password is
    /// hashed here so callers never hold it longer than needed.
    pub fn development(admin_username: &str, admin_password: &str) -> Result<Self> {
        Ok(Self {
            host: "0.0.0.0".into(),
            port: 3000,
            db_path: PathBuf::from("memorial.db"),
            production: false,
            proxy_hops: 0,
            allowed_origin: None,
            admin_username: admin_username.to_string(),
            admin_password_hash: hash_password(admin_password)?,
            session_secret: DEFAULT_SESSION_SECRET.into(),
            public_dir: PathBuf::from("./public"),
            upload_dir: PathBuf::from("./uploads"),
            upload_url_prefix: "/uploads".into(),
            remote_blob: None,
        })
    }

    /// Reads the process environment. Call `dotenvy::dotenv()` first if a
    /// `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        let production =
            env_or("MEMORIAL_ENV", "development").eq_ignore_ascii_case("production");

        let admin_username = std::env::var("ADMIN_USERNAME").ok();
        let admin_password = std::env::var("ADMIN_PASSWORD").ok();
        let admin_password_hash = std::env::var("ADMIN_PASSWORD_HASH").ok();

        let password_unset = admin_password.is_none() && admin_password_hash.is_none();
        if admin_username.is_none() || password_unset {
            warn!("Using default admin credentials; set ADMIN_USERNAME and ADMIN_PASSWORD");
        }

        let admin_password_hash = match (admin_password_hash, admin_password) {
            (Some(hash), _) => {
                argon2::PasswordHash::new(&hash).map_err(|e| {
                    anyhow::anyhow!("ADMIN_PASSWORD_HASH is not a valid PHC string: {}", e)
                })?;
                hash
            }
            (None, Some(plain)) => hash_password(&plain)?,
            (None, None) => hash_password(DEFAULT_ADMIN_PASSWORD)?,
        };

        let session_secret = env_or("SESSION_SECRET", DEFAULT_SESSION_SECRET);
        if PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            if production {
                bail!(
                    "SESSION_SECRET is unset or still a placeholder; \
                     refusing to start in production"
                );
            }
            warn!("SESSION_SECRET is a placeholder; fine for development only");
        }

        let port: u16 = env_or("MEMORIAL_PORT", "3000")
            .parse()
            .context("MEMORIAL_PORT must be a port number")?;

        let trust_proxy = std::env::var("MEMORIAL_TRUST_PROXY").ok();
        let proxy_hops = parse_proxy_hops(trust_proxy.as_deref())?;
        if proxy_hops > 0 {
            info!("Trusting {} proxy hop(s) in X-Forwarded-For", proxy_hops);
        }

        let remote_blob = match (
            std::env::var("BLOB_API_URL"),
            std::env::var("BLOB_READ_WRITE_TOKEN"),
        ) {
            (Ok(api_url), Ok(token)) if !api_url.is_empty() && !token.is_empty() => {
                Some(RemoteBlobConfig { api_url, token })
            }
            _ => None,
        };

        let config = Self {
            host: env_or("MEMORIAL_HOST", "0.0.0.0"),
            port,
            db_path: env_or("MEMORIAL_DB_PATH", "memorial.db").into(),
            production,
            proxy_hops,
            allowed_origin: std::env::var("MEMORIAL_ALLOWED_ORIGIN")
                .ok()
                .filter(|s| !s.is_empty()),
            admin_username: admin_username.unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.into()),
            admin_password_hash,
            session_secret,
            public_dir: env_or("MEMORIAL_PUBLIC_DIR", "./public").into(),
            upload_dir: env_or("MEMORIAL_UPLOAD_DIR", "./uploads").into(),
            upload_url_prefix: "/uploads".into(),
            remote_blob,
        };

        info!(
            "Config loaded: env={}, db={}, blob store={}",
            if config.production { "production" } else { "development" },
            config.db_path.display(),
            if config.remote_blob.is_some() { "remote" } else { "local" },
        );
        Ok(config)
    }
}

/// `MEMORIAL_TRUST_PROXY`: unset, empty or a false-y word means no proxy;
/// `true`/`yes` means one hop; a number gives the hop count.
fn parse_proxy_hops(raw: Option<&str>) -> Result<usize> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(0);
    };
    match raw.to_ascii_lowercase().as_str() {
        "false" | "no" | "off" => Ok(0),
        "true" | "yes" | "on" => Ok(1),
        n => n.parse().with_context(|| {
            format!("MEMORIAL_TRUST_PROXY must be a boolean or hop count, got '{}'", raw)
        }),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;

    #[test]
    fn development_config_hashes_password() {
        let config = Config::development("admin", "s3cret").unwrap();
        assert_ne!(config.admin_password_hash, "s3cret");
        assert!(config.admin_password_hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &config.admin_password_hash));
        assert!(!config.production);
        assert_eq!(config.proxy_hops, 0);
    }

    #[test]
    fn proxy_trust_is_opt_in() {
        assert_eq!(parse_proxy_hops(None).unwrap(), 0);
        assert_eq!(parse_proxy_hops(Some("")).unwrap(), 0);
        assert_eq!(parse_proxy_hops(Some("false")).unwrap(), 0);
        assert_eq!(parse_proxy_hops(Some("true")).unwrap(), 1);
        assert_eq!(parse_proxy_hops(Some("2")).unwrap(), 2);
        assert!(parse_proxy_hops(Some("sometimes")).is_err());
    }
}
