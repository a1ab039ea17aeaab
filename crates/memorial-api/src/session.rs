//! Server-side sessions stored in the `sessions` table.
//!
//! The cookie only carries a random token. It travels in a
//! [`SignedCookieJar`] keyed from the configured session secret, so a
//! tampered or unsigned cookie reads as no cookie at all. Expiry slides:
//! every successful load pushes it forward.

use std::sync::Arc;

use anyhow::Result;
use axum_extra::extract::SignedCookieJar;
use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha512};
use tracing::{error, info};

use memorial_db::Database;
use memorial_types::models::SessionData;

pub const SESSION_COOKIE: &str = "memorial.sid";
pub const SESSION_TTL_HOURS: i64 = 24;

/// A session that was found, verified and is still live.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub id: String,
    pub data: SessionData,
}

impl ActiveSession {
    pub fn is_admin(&self) -> bool {
        self.data.is_admin
    }

    /// Name for audit logs.
    pub fn username(&self) -> &str {
        self.data.username.as_deref().unwrap_or("admin")
    }
}

#[derive(Clone)]
pub struct SessionManager {
    db: Arc<Database>,
    key: Key,
    secure: bool,
}

impl SessionManager {
    pub fn new(db: Arc<Database>, secret: &str, secure: bool) -> Result<Self> {
        Ok(Self {
            db,
            key: signing_key(secret)?,
            secure,
        })
    }

    /// Key the cookie jar signs with.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Resolves the request's session, refreshing its expiry. Missing,
    /// forged or expired cookies all yield `None`.
    pub async fn load(&self, jar: &SignedCookieJar) -> Result<Option<ActiveSession>> {
        let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
            return Ok(None);
        };

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<ActiveSession>> {
            let now = Utc::now();
            let Some(row) = db.get_session(&token, now)? else {
                return Ok(None);
            };
            db.touch_session(&token, now + Duration::hours(SESSION_TTL_HOURS))?;
            Ok(Some(ActiveSession {
                data: row.session_data(),
                id: token,
            }))
        })
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("session lookup task failed")
        })?
    }

    /// Persists a fresh session under a new random token and adds its cookie
    /// to `jar`.
    pub async fn create(
        &self,
        jar: SignedCookieJar,
        data: SessionData,
    ) -> Result<(ActiveSession, SignedCookieJar)> {
        let token = new_token();
        let payload = serde_json::to_string(&data)?;

        let db = self.db.clone();
        let id = token.clone();
        tokio::task::spawn_blocking(move || {
            db.save_session(&id, &payload, Utc::now() + Duration::hours(SESSION_TTL_HOURS))
        })
        .await
        .map_err(|e| anyhow::anyhow!("session save task failed: {}", e))??;

        if let Some(username) = &data.username {
            info!("Session started for {}", username);
        }

        let jar = self.refresh(jar, &token);
        Ok((ActiveSession { id: token, data }, jar))
    }

    pub async fn destroy(&self, id: &str) -> Result<()> {
        let db = self.db.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || db.delete_session(&id))
            .await
            .map_err(|e| anyhow::anyhow!("session delete task failed: {}", e))?
    }

    /// Destroys whatever session the cookie points at, if any.
    pub async fn destroy_from(&self, jar: &SignedCookieJar) -> Result<()> {
        match jar.get(SESSION_COOKIE) {
            Some(cookie) => self.destroy(cookie.value()).await,
            None => Ok(()),
        }
    }

    pub fn prune_expired(&self) -> Result<usize> {
        self.db.prune_expired_sessions(Utc::now())
    }

    /// Re-issues the session cookie for another full TTL.
    pub fn refresh(&self, jar: SignedCookieJar, token: &str) -> SignedCookieJar {
        jar.add(self.cookie(token.to_string()))
    }

    /// Removes the session cookie from the browser.
    pub fn clear(&self, jar: SignedCookieJar) -> SignedCookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }

    fn cookie(&self, token: String) -> Cookie<'static> {
        // Cross-site SameSite=None is only accepted by browsers with Secure.
        let same_site = if self.secure { SameSite::None } else { SameSite::Lax };
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(same_site)
            .max_age(time::Duration::hours(SESSION_TTL_HOURS))
            .build()
    }
}

/// Stretches the configured secret to the 64 bytes the cookie key needs.
fn signing_key(secret: &str) -> Result<Key> {
    let digest = Sha512::digest(secret.as_bytes());
    Key::try_from(digest.as_slice())
        .map_err(|e| anyhow::anyhow!("Invalid session secret: {}", e))
}

fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    B64.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, header};
    use axum::response::IntoResponse;

    fn manager(secure: bool) -> SessionManager {
        let db = Arc::new(Database::open_in_memory().unwrap());
        SessionManager::new(db, "test-secret", secure).unwrap()
    }

    fn jar_with(m: &SessionManager, cookie: &str) -> SignedCookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        SignedCookieJar::from_headers(&headers, m.key().clone())
    }

    fn empty_jar(m: &SessionManager) -> SignedCookieJar {
        SignedCookieJar::new(m.key().clone())
    }

    /// The `Set-Cookie` header a jar would send.
    fn set_cookie(jar: SignedCookieJar) -> String {
        let res = jar.into_response();
        res.headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    fn cookie_pair(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[test]
    fn cookie_flags_follow_mode() {
        let dev = manager(false);
        let dev = set_cookie(dev.refresh(empty_jar(&dev), "t"));
        assert!(dev.starts_with("memorial.sid="));
        assert!(dev.contains("HttpOnly"));
        assert!(dev.contains("SameSite=Lax"));
        assert!(!dev.contains("Secure"));
        assert!(dev.contains("Max-Age=86400"));
        assert!(dev.contains("Path=/"));

        let prod = manager(true);
        let prod = set_cookie(prod.refresh(empty_jar(&prod), "t"));
        assert!(prod.contains("Secure"));
        assert!(prod.contains("SameSite=None"));
    }

    #[test]
    fn clear_expires_the_cookie() {
        let m = manager(false);
        let cleared = set_cookie(m.clear(jar_with(&m, "memorial.sid=anything")));
        assert!(cleared.starts_with("memorial.sid="));
        assert!(cleared.contains("Max-Age=0"));
    }

    #[test]
    fn short_secrets_still_make_a_key() {
        assert!(signing_key("x").is_ok());
    }

    #[tokio::test]
    async fn create_then_load_then_destroy() {
        let m = manager(false);
        let (session, jar) = m
            .create(
                empty_jar(&m),
                SessionData {
                    is_admin: true,
                    username: Some("admin".into()),
                },
            )
            .await
            .unwrap();

        let jar = jar_with(&m, &cookie_pair(&set_cookie(jar)));
        let loaded = m.load(&jar).await.unwrap().unwrap();
        assert_eq!(loaded.id, session.id);
        assert!(loaded.is_admin());
        assert_eq!(loaded.username(), "admin");

        m.destroy_from(&jar).await.unwrap();
        assert!(m.load(&jar).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unsigned_cookie_is_ignored() {
        let m = manager(false);
        let (session, _) = m
            .create(empty_jar(&m), SessionData::default())
            .await
            .unwrap();

        let jar = jar_with(&m, &format!("{}={}", SESSION_COOKIE, session.id));
        assert!(m.load(&jar).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cookie_from_another_secret_is_ignored() {
        let m = manager(false);
        let (_, jar) = m.create(empty_jar(&m), SessionData::default()).await.unwrap();
        let pair = cookie_pair(&set_cookie(jar));

        let other = SessionManager::new(
            Arc::new(Database::open_in_memory().unwrap()),
            "another-secret",
            false,
        )
        .unwrap();
        assert!(other.load(&jar_with(&other, &pair)).await.unwrap().is_none());
    }
}
