use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        Ack, CommentRequest, CommentResponse, CreateEventRequest, CreatedEventResponse,
        JoinEventRequest,
    },
    repo_types::Event,
    services::{self, parse_id},
};
use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    extract::{AppJson, AppPath},
    state::AppState,
};

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/join", post(join_event))
        .route("/events/comment", post(comment_on_event))
        .route("/events/:id", get(get_event).delete(delete_event))
        .route(
            "/events/:event_id/comments/:comment_id",
            delete(delete_comment),
        )
}

#[instrument(skip(state))]
pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, AppError> {
    Ok(Json(state.events.list().await?))
}

#[instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
) -> Result<Json<Event>, AppError> {
    let id = parse_id(&id, "event id")?;
    Ok(Json(state.events.get(id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_event(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(body): AppJson<CreateEventRequest>,
) -> Result<(StatusCode, HeaderMap, Json<CreatedEventResponse>), AppError> {
    let event_id =
        services::create_event(state.events.as_ref(), caller.id, &caller.name, body).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/events/{event_id}")) {
        headers.insert(header::LOCATION, location);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(CreatedEventResponse {
            success: true,
            event_id,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn join_event(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(body): AppJson<JoinEventRequest>,
) -> Result<Json<Ack>, AppError> {
    let event_id = parse_id(&body.event_id, "eventId")?;
    services::join_event(state.events.as_ref(), state.users.as_ref(), event_id, caller.id)
        .await?;
    Ok(Json(Ack::ok()))
}

#[instrument(skip(state, body))]
pub async fn comment_on_event(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(body): AppJson<CommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let event_id = parse_id(&body.event_id, "eventId")?;
    let comment = services::add_comment(
        state.events.as_ref(),
        state.users.as_ref(),
        event_id,
        caller.id,
        &body.text,
    )
    .await?;
    Ok(Json(CommentResponse {
        success: true,
        comment,
    }))
}

#[instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<Json<Ack>, AppError> {
    let event_id = parse_id(&id, "event id")?;
    services::delete_event(state.events.as_ref(), state.users.as_ref(), event_id, caller.id)
        .await?;
    Ok(Json(Ack::ok()))
}

#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath((event_id, comment_id)): AppPath<(String, String)>,
) -> Result<Json<Ack>, AppError> {
    let event_id = parse_id(&event_id, "event id")?;
    let comment_id = parse_id(&comment_id, "comment id")?;
    services::delete_comment(state.events.as_ref(), event_id, comment_id, caller.id).await?;
    Ok(Json(Ack::ok()))
}
