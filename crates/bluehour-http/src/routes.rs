//! Route table and handlers

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use bluehour_api::{
    API_VERSION, AuthResponse, CreateEntryRequest, EntryFilter, HealthResponse, ImportRecord,
    LoginRequest, MeResponse, SignUpRequest, SuccessResponse, UpdateEntryRequest,
};
use bluehour_core::IMPORT_REJECTED_MESSAGE;
use bluehour_util::{EntryId, format_calendar_date, parse_calendar_date};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::extract::{clear_session_cookie, session_cookie};
use crate::{AppError, AppState, ClientIdentity, CurrentUser};

const TOO_MANY_REQUESTS: &str = "Too many requests. Please wait a moment before trying again.";
const TOO_MANY_SIGNUPS: &str = "Too many signup attempts. Please try again later.";
const TOO_MANY_LOGINS: &str = "Too many login attempts. Please try again later.";

const LOGIN_TO_CONTINUE: &str = "Please login to continue.";
const LOGIN_TO_SAVE: &str = "Please login to save a check-in.";
const LOGIN_TO_VIEW: &str = "Please login to view your reflections.";
const LOGIN_TO_MANAGE: &str = "Please login to manage your reflections.";
const LOGIN_TO_EXPORT: &str = "Please login to export your reflections.";
const LOGIN_TO_IMPORT: &str = "Please login to import reflections.";

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/login", post(log_in))
        .route("/api/auth/logout", post(log_out))
        .route("/api/auth/me", get(me))
        .route("/api/entries", get(list_entries).post(create_entry))
        .route("/api/entries/{id}", patch(update_entry).delete(delete_entry))
        .route("/api/export", get(export_entries))
        .route("/api/import", post(import_entries))
        .route("/api/report", get(report))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state
        .run(|journal| Ok(journal.store().is_healthy()))
        .await
        .unwrap_or(false);

    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if store_ok { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            api_version: API_VERSION,
            timestamp: bluehour_util::now().to_rfc3339(),
            store: store_ok,
        }),
    )
}

async fn sign_up(
    State(state): State<AppState>,
    client: ClientIdentity,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    state.admit("signup", client.as_str(), TOO_MANY_SIGNUPS).await?;
    let Json(req) = body?;

    let user = state.run(move |journal| journal.sign_up(&req)).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Account created successfully!".into(),
            user,
        }),
    )
        .into_response())
}

async fn log_in(
    State(state): State<AppState>,
    client: ClientIdentity,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    state.admit("login", client.as_str(), TOO_MANY_LOGINS).await?;
    let Json(req) = body?;

    let (user, token) = state.run(move |journal| journal.log_in(&req)).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(
            &token,
            state.journal.session_ttl(),
            state.config.server.secure_cookies,
        ),
    );

    Ok((
        headers,
        Json(AuthResponse {
            message: "Login successful!".into(),
            user,
        }),
    )
        .into_response())
}

async fn log_out(State(state): State<AppState>, current: CurrentUser) -> Result<Response, AppError> {
    if let Some(token) = current.token {
        state.run(move |journal| journal.log_out(&token)).await?;
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        clear_session_cookie(state.config.server.secure_cookies),
    );

    Ok((headers, Json(SuccessResponse { success: true })).into_response())
}

async fn me(current: CurrentUser) -> Result<Json<MeResponse>, AppError> {
    let user = current.require(LOGIN_TO_CONTINUE)?;
    Ok(Json(MeResponse { user }))
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    filter: Option<String>,
}

async fn list_entries(
    State(state): State<AppState>,
    current: CurrentUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let user = current.require(LOGIN_TO_VIEW)?;
    let Query(query) = query?;

    let filter: EntryFilter = query
        .filter
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|e: bluehour_api::UnknownFilter| AppError::bad_request(e.to_string()))?;

    let entries = state
        .run(move |journal| journal.list_entries(&user, filter))
        .await?;

    Ok(Json(entries).into_response())
}

async fn create_entry(
    State(state): State<AppState>,
    client: ClientIdentity,
    current: CurrentUser,
    body: Result<Json<CreateEntryRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let user = current.require(LOGIN_TO_SAVE)?;
    state.admit("checkin", client.as_str(), TOO_MANY_REQUESTS).await?;
    let Json(req) = body?;

    let entry = state
        .run(move |journal| journal.create_entry(&user, &req))
        .await?;

    Ok((StatusCode::CREATED, Json(entry)).into_response())
}

fn parse_entry_id(raw: &str) -> Result<EntryId, AppError> {
    raw.parse()
        .map_err(|_| AppError::bad_request("Invalid entry ID format"))
}

async fn update_entry(
    State(state): State<AppState>,
    client: ClientIdentity,
    current: CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateEntryRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let user = current.require(LOGIN_TO_MANAGE)?;
    state.admit("update", client.as_str(), TOO_MANY_REQUESTS).await?;
    let id = parse_entry_id(&id)?;
    let Json(req) = body?;

    let entry = state
        .run(move |journal| journal.update_entry(&user, &id, &req))
        .await?;

    Ok(Json(entry).into_response())
}

async fn delete_entry(
    State(state): State<AppState>,
    client: ClientIdentity,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let user = current.require(LOGIN_TO_MANAGE)?;
    state.admit("delete", client.as_str(), TOO_MANY_REQUESTS).await?;
    let id = parse_entry_id(&id)?;

    state
        .run(move |journal| journal.delete_entry(&user, &id))
        .await?;

    Ok(Json(SuccessResponse { success: true }).into_response())
}

async fn export_entries(
    State(state): State<AppState>,
    client: ClientIdentity,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let user = current.require(LOGIN_TO_EXPORT)?;
    state.admit("export", client.as_str(), TOO_MANY_REQUESTS).await?;

    let entries = state
        .run(move |journal| journal.export_entries(&user))
        .await?;
    let body = serde_json::to_string_pretty(&entries)
        .map_err(|e| AppError::Internal(format!("export serialization failed: {e}")))?;

    let filename = format!(
        "attachment; filename=\"bluehour-entries-{}.json\"",
        format_calendar_date(bluehour_util::today())
    );
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(&filename) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((headers, body).into_response())
}

async fn import_entries(
    State(state): State<AppState>,
    client: ClientIdentity,
    current: CurrentUser,
    body: Result<Json<Vec<ImportRecord>>, JsonRejection>,
) -> Result<Response, AppError> {
    let user = current.require(LOGIN_TO_IMPORT)?;
    state.admit("import", client.as_str(), TOO_MANY_REQUESTS).await?;
    let Json(records) = body.map_err(|rejection| AppError::BadRequest {
        message: IMPORT_REJECTED_MESSAGE.into(),
        details: Some(serde_json::Value::String(rejection.body_text())),
    })?;

    let outcome = state
        .run(move |journal| journal.import_entries(&user, &records))
        .await?;

    Ok(Json(outcome).into_response())
}

#[derive(Debug, Default, Deserialize)]
struct ReportQuery {
    #[serde(default)]
    days: Option<String>,
    #[serde(default)]
    until: Option<String>,
}

async fn report(
    State(state): State<AppState>,
    current: CurrentUser,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let user = current.require(LOGIN_TO_VIEW)?;
    let Query(query) = query?;

    let requested = match query.days.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| AppError::bad_request("days must be a whole number"))?,
        ),
    };
    let days = state.config.report.resolve_days(requested);

    let reference = match query.until.as_deref() {
        None | Some("") => bluehour_util::today(),
        Some(raw) => parse_calendar_date(raw)
            .ok_or_else(|| AppError::bad_request("until must be a YYYY-MM-DD date"))?,
    };

    let report = state
        .run(move |journal| journal.report(&user, days, reference))
        .await?;

    Ok(Json(report).into_response())
}
