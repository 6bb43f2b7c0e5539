use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use time::Duration;
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{GoogleLoginRequest, PublicUser},
        extractors::{AuthUser, SESSION_COOKIE},
        jwt::SessionKeys,
        services::sign_in,
    },
    error::AppError,
    extract::AppJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/google", post(google_login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_me))
}

fn session_cookie(token: String, max_age: Option<Duration>, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .path("/");
    // plain sessions live as long as the browser session
    if let Some(age) = max_age {
        cookie = cookie.max_age(age);
    }
    cookie.build()
}

#[instrument(skip(state, jar, payload))]
pub async fn google_login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<GoogleLoginRequest>,
) -> Result<(CookieJar, Json<PublicUser>), AppError> {
    let user = sign_in(state.verifier.as_ref(), state.users.as_ref(), &payload.token).await?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.name, payload.remember)?;
    let max_age = payload.remember.then(|| keys.lifetime(true));
    let cookie = session_cookie(token, max_age, state.config.session.cookie_secure);

    Ok((jar.add(cookie), Json(user.into())))
}

#[instrument(skip_all)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    info!("session cleared");
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(json!({ "success": true })))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    match state.users.find_by_id(caller.id).await {
        Ok(user) => Ok(Json(user.into())),
        // a valid credential for a user that no longer exists
        Err(AppError::NotFound(_)) => Err(AppError::Unauthenticated),
        Err(e) => Err(e),
    }
}
