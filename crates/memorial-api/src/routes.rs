use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::warn;

use crate::config::Config;
use crate::middleware::require_auth;
use crate::state::AppState;
use crate::upload::MAX_REQUEST_BYTES;
use crate::{auth, gallery, memories};

/// The JSON API plus `/health`, with state applied.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/gallery", get(gallery::admin_list).post(gallery::upload))
        .route("/gallery/reorder", put(gallery::reorder))
        .route(
            "/gallery/{id}",
            put(gallery::update_caption).delete(gallery::delete),
        )
        .route("/memories", get(memories::admin_list))
        .route("/memories/{id}", put(memories::update).delete(memories::delete))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/status", get(auth::status))
        .merge(protected);

    let api = Router::new()
        .route("/memories", get(memories::list).post(memories::create))
        .route("/gallery", get(gallery::list))
        .nest("/admin", admin);

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(state)
}

/// GET /health: liveness check (no auth).
pub async fn health() -> &'static str {
    "ok"
}

/// Development mirrors any origin with credentials; production only allows
/// the configured origin, or nothing (same-origin) when none is set.
pub fn cors_layer(config: &Config) -> CorsLayer {
    if !config.production {
        return CorsLayer::very_permissive();
    }

    let Some(origin) = config.allowed_origin.as_deref() else {
        return CorsLayer::new();
    };

    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
        Err(e) => {
            warn!("Ignoring invalid MEMORIAL_ALLOWED_ORIGIN '{}': {}", origin, e);
            CorsLayer::new()
        }
    }
}

// -- Security headers --

/// Images may come from the remote blob CDN; scripts and styles from the
/// cropper CDN the admin page loads.
const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; base-uri 'self'; \
    img-src 'self' data: https://*.public.blob.vercel-storage.com https://*.vercel-storage.com; \
    script-src 'self' 'unsafe-inline' https://cdnjs.cloudflare.com; \
    script-src-attr 'unsafe-inline'; \
    style-src 'self' 'unsafe-inline' https://cdnjs.cloudflare.com; \
    font-src 'self'; connect-src 'self'; form-action 'self'; frame-ancestors 'self'; \
    frame-src 'none'; object-src 'none'";

const HSTS: &str = "max-age=31536000; includeSubDomains";

/// Response headers added to everything the server sends. HSTS and
/// `upgrade-insecure-requests` are production-only.
pub fn security_headers(production: bool) -> Vec<(HeaderName, HeaderValue)> {
    let csp = if production {
        format!("{}; upgrade-insecure-requests", CONTENT_SECURITY_POLICY)
    } else {
        CONTENT_SECURITY_POLICY.to_string()
    };

    let mut headers = vec![
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (header::X_XSS_PROTECTION, HeaderValue::from_static("0")),
        (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ),
    ];
    match HeaderValue::from_str(&csp) {
        Ok(value) => headers.push((header::CONTENT_SECURITY_POLICY, value)),
        Err(e) => warn!("Skipping Content-Security-Policy: {}", e),
    }
    if production {
        headers.push((header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS)));
    }
    headers
}

/// Layers [`security_headers`] onto `app`, leaving any header a handler
/// already set untouched.
pub fn with_security_headers(app: Router, production: bool) -> Router {
    security_headers(production)
        .into_iter()
        .fold(app, |app, (name, value)| {
            app.layer(SetResponseHeaderLayer::if_not_present(name, value))
        })
}
