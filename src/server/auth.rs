//! Authentication and authorization middleware for the API and web UI.
//!
//! Login is delegated to plex.tv: the client requests a PIN, the user claims
//! it at plex.tv/link, and polling the PIN yields an account token. The token
//! is verified against the paired server once, at claim time; afterwards the
//! session rides in a signed-enough cookie that is validated locally.

use crate::error::Error;
use crate::server::error::ApiError;
use crate::server::AppContext;
use axum::{
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::Next,
    response::Response,
    Extension, Json,
};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar},
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeader,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::plex::LoginPin;

const SESSION_COOKIE_NAME: &str = "plexclip_session";

/// The authenticated account, inserted into request extensions by
/// [`require_user`]. Absent when auth is disabled.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub name: String,
}

/// The requesting user's display name, or empty when auth is disabled.
pub fn current_user_name(user: Option<Extension<CurrentUser>>) -> String {
    user.map(|Extension(u)| u.name).unwrap_or_default()
}

/// Session data stored in the cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionData {
    username: String,
    expires_at: u64,
}

impl SessionData {
    fn new(username: &str, timeout_hours: u64) -> Self {
        let expires_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + (timeout_hours * 3600);
        Self {
            username: username.to_string(),
            expires_at,
        }
    }

    fn is_valid(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        now < self.expires_at
    }

    fn encode(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    fn decode(encoded: &str) -> Option<Self> {
        let json = STANDARD.decode(encoded).ok()?;
        serde_json::from_slice(&json).ok()
    }
}

/// The valid session carried by the cookie jar, if any.
fn session_from_jar(jar: &CookieJar) -> Option<SessionData> {
    jar.get(SESSION_COOKIE_NAME)
        .and_then(|c| SessionData::decode(c.value()))
        .filter(|s| s.is_valid())
}

fn session_cookie(session: &SessionData, timeout_hours: u64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session.encode()))
        .path("/")
        .http_only(true)
        .same_site(axum_extra::extract::cookie::SameSite::Lax)
        .max_age(time::Duration::hours(timeout_hours as i64))
        .build()
}

/// Middleware guarding the protected API routes.
///
/// A valid session cookie passes without any remote traffic. A bearer token
/// is treated as a raw plex.tv account token and verified upstream on every
/// request, which keeps scripted access possible without a cookie jar.
pub async fn require_user(
    State(ctx): State<AppContext>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(session) = session_from_jar(&jar) {
        request.extensions_mut().insert(CurrentUser {
            name: session.username,
        });
        return Ok(next.run(request).await);
    }

    if let Some(TypedHeader(bearer)) = bearer {
        let token = bearer.token();
        let account = ctx.plex_tv.account(token).await?;
        if !ctx.plex_tv.can_access_server(token, &ctx.machine_id).await? {
            return Err(Error::Unauthorized(format!(
                "{} has no access to this server",
                account.display_name()
            ))
            .into());
        }
        request.extensions_mut().insert(CurrentUser {
            name: account.display_name().to_string(),
        });
        return Ok(next.run(request).await);
    }

    Err(Error::Unauthorized("Authentication required".to_string()).into())
}

/// Request a fresh login PIN from plex.tv.
pub async fn create_pin(State(ctx): State<AppContext>) -> Result<Json<LoginPin>, ApiError> {
    let pin = ctx.plex_tv.create_pin().await?;
    Ok(Json(pin))
}

#[derive(Serialize)]
pub struct ClaimResponse {
    pub claimed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

/// Poll a PIN. Once the user has claimed it on plex.tv the resulting account
/// token is checked against the paired server and exchanged for a session
/// cookie; the token itself is never stored.
pub async fn poll_pin(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Path(pin_id): Path<i64>,
) -> Result<(CookieJar, Json<ClaimResponse>), ApiError> {
    let Some(token) = ctx.plex_tv.claim_pin(pin_id).await? else {
        return Ok((
            jar,
            Json(ClaimResponse {
                claimed: false,
                username: None,
                expires_at: None,
            }),
        ));
    };

    let account = ctx.plex_tv.account(&token).await?;
    if !ctx.plex_tv.can_access_server(&token, &ctx.machine_id).await? {
        return Err(Error::Unauthorized(format!(
            "{} has no access to this server",
            account.display_name()
        ))
        .into());
    }

    let timeout_hours = ctx.config.server.auth.session_timeout_hours;
    let session = SessionData::new(account.display_name(), timeout_hours);
    let expires_at = session.expires_at;
    let cookie = session_cookie(&session, timeout_hours);

    tracing::info!(user = %account.display_name(), "Login via plex.tv PIN");

    Ok((
        jar.add(cookie),
        Json(ClaimResponse {
            claimed: true,
            username: Some(account.display_name().to_string()),
            expires_at: Some(expires_at),
        }),
    ))
}

/// Logout handler
pub async fn logout(jar: CookieJar) -> (CookieJar, axum::http::StatusCode) {
    let cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();

    (jar.remove(cookie), axum::http::StatusCode::OK)
}

#[derive(Serialize)]
pub struct AuthStatusResponse {
    pub auth_enabled: bool,
    pub authenticated: bool,
    pub username: Option<String>,
}

/// Check current auth status
pub async fn auth_status(State(ctx): State<AppContext>, jar: CookieJar) -> Json<AuthStatusResponse> {
    if !ctx.config.server.auth.enabled {
        return Json(AuthStatusResponse {
            auth_enabled: false,
            authenticated: true,
            username: None,
        });
    }

    let session = session_from_jar(&jar);

    Json(AuthStatusResponse {
        auth_enabled: true,
        authenticated: session.is_some(),
        username: session.map(|s| s.username),
    })
}
