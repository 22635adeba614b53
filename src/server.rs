//!
//! camwatch HTTP server
//! --------------------
//! This module defines the Axum-based JSON API consumed by the dashboard front end.
//!
//! Responsibilities:
//! - Login/logout endpoints backed by the `Authenticator`.
//! - Session and navigation queries (`/session`, `/navigate`) for the route guard.
//! - Camera and alert reads scoped by the access filter, plus alert triage.
//! - Admin-only camera registration, editing and deletion.
//! - Admin-only user management over the `StaticDirectory`.
//! - Theme/language preferences and message translation.
//!
//! The session is process-wide: it is restored from storage once at startup, before the
//! listener accepts connections, and every handler reads a snapshot of it.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::{get, post, put}, Router, extract::{Path, Query, State}, Json};
use axum::response::{IntoResponse, Response};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, error};
use anyhow::Context;

use crate::catalog::{AlertStatus, CameraPatch, Catalog, NewCamera};
use crate::config::Config;
use crate::error::{AppError, AuthError};
use crate::guard::{evaluate, navigate, RouteDecision};
use crate::identity::{Authenticator, NewUser, Role, RoleKind, Session, SessionContext, StaticDirectory, UserUpdate};
use crate::prefs::{translate, Language, MessageKey, Preferences, Theme};
use crate::storage::{FileStorage, SharedStorage};

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Authenticator>,
    pub session: Arc<SessionContext>,
    pub directory: Arc<StaticDirectory>,
    pub catalog: Arc<Catalog>,
    pub storage: SharedStorage,
}

impl AppState {
    /// Wire the components together and restore the persisted session.
    pub fn new(directory: Arc<StaticDirectory>, catalog: Arc<Catalog>, storage: SharedStorage) -> Self {
        let session = Arc::new(SessionContext::new());
        let auth = Arc::new(Authenticator::new(directory.clone(), storage.clone(), session.clone()));
        let restored = auth.restore_session();
        info!(
            target: "camwatch::server",
            "session restored: signed_in={} role={:?}",
            restored.identity.is_some(), restored.role_kind()
        );
        Self { auth, session, directory, catalog, storage }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() { error!(target: "camwatch::server", "request failed: {self}"); }
        (status, Json(json!({"status":"error","error": self}))).into_response()
    }
}

/// Apply the route guard to an API call. Anonymous callers get 401, callers with the
/// wrong role 403, and calls made before the session is restored 503.
fn require(state: &AppState, required: Option<RoleKind>, path: &str) -> Result<Session, Response> {
    let session = state.session.snapshot();
    match evaluate(&session, required, path) {
        RouteDecision::Allowed => Ok(session),
        RouteDecision::Loading => Err((StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status":"loading"}))).into_response()),
        RouteDecision::RedirectLogin { from } => {
            Err((StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized","redirect":"/login","from": from}))).into_response())
        }
        RouteDecision::RedirectDefault { to } => {
            Err((StatusCode::FORBIDDEN, Json(json!({"status":"forbidden","redirect": to}))).into_response())
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "camwatch ok" }))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(get_session))
        .route("/navigate", get(get_navigate))
        .route("/summary", get(get_summary))
        .route("/cameras", get(list_cameras).post(create_camera))
        .route("/cameras/{id}", get(get_camera).put(update_camera).delete(remove_camera))
        .route("/alerts", get(list_alerts))
        .route("/alerts/{id}/status", post(set_alert_status))
        .route("/users", get(list_users).post(add_user))
        .route("/users/{id}", put(update_user).delete(remove_user))
        .route("/users/{id}/cameras", put(assign_cameras))
        .route("/users/{id}/password", put(set_password))
        .route("/preferences", get(get_preferences).put(put_preferences))
        .route("/i18n/{key}", get(get_translation))
        .with_state(state)
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let storage: SharedStorage = Arc::new(
        FileStorage::new(&config.data_dir)
            .with_context(|| format!("While opening session storage under: {}", config.data_dir))?,
    );
    let directory = Arc::new(StaticDirectory::demo(config.auth_mode, config.demo_password.as_deref())?);
    let state = AppState::new(directory, Arc::new(Catalog::with_fixtures()), storage);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!(target: "camwatch::server", "Starting server on {} auth_mode={:?}", addr, config.auth_mode);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct LoginPayload { email: String, password: String }

async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> Response {
    match state.auth.login(&payload.email, &payload.password).await {
        Ok(user) => (StatusCode::OK, Json(json!({"status":"ok","user": user}))).into_response(),
        Err(AuthError::InvalidCredentials) => {
            (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized","error":"invalid email or password"}))).into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

async fn logout(State(state): State<AppState>) -> Response {
    state.auth.logout();
    (StatusCode::OK, Json(json!({"status":"ok"}))).into_response()
}

async fn get_session(State(state): State<AppState>) -> Response {
    Json(json!({"status":"ok","session": state.session.snapshot()})).into_response()
}

#[derive(Debug, Deserialize)]
struct NavigateQuery { path: String }

async fn get_navigate(State(state): State<AppState>, Query(q): Query<NavigateQuery>) -> Response {
    let nav = navigate(&state.session.snapshot(), &q.path);
    Json(json!({"status":"ok","navigation": nav})).into_response()
}

async fn get_summary(State(state): State<AppState>) -> Response {
    let session = match require(&state, None, "/dashboard") { Ok(s) => s, Err(r) => return r };
    Json(json!({"status":"ok","summary": state.catalog.summary(&session)})).into_response()
}

async fn list_cameras(State(state): State<AppState>) -> Response {
    let session = match require(&state, None, "/cameras") { Ok(s) => s, Err(r) => return r };
    Json(json!({"status":"ok","cameras": state.catalog.cameras(&session)})).into_response()
}

async fn get_camera(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let session = match require(&state, None, &format!("/camera/{id}")) { Ok(s) => s, Err(r) => return r };
    match state.catalog.camera(&session, &id) {
        Some(camera) => Json(json!({"status":"ok","camera": camera})).into_response(),
        // unknown and not-entitled look the same to the caller
        None => AppError::not_found("camera_not_found".to_string(), format!("no camera {id}")).into_response(),
    }
}

/// The owning client is entitled to the new camera straight away.
async fn create_camera(State(state): State<AppState>, Json(payload): Json<NewCamera>) -> Response {
    let session = match require(&state, Some(RoleKind::Admin), "/cameras") { Ok(s) => s, Err(r) => return r };
    match state.directory.get(payload.client_id.trim()) {
        Some(owner) if !owner.role.is_admin() => {}
        _ => return AppError::user("invalid_client".to_string(), format!("'{}' is not a client", payload.client_id)).into_response(),
    }
    let camera = match state.catalog.create_camera(&session, payload) { Ok(c) => c, Err(e) => return e.into_response() };
    if let Err(e) = state.directory.grant_camera(&camera.client_id, &camera.id) { return e.into_response(); }
    refresh_if_current(&state, &camera.client_id).await;
    info!(target: "camwatch::server", "camera {} added for client {}", camera.id, camera.client_id);
    (StatusCode::CREATED, Json(json!({"status":"ok","camera": camera}))).into_response()
}

async fn update_camera(State(state): State<AppState>, Path(id): Path<String>, Json(patch): Json<CameraPatch>) -> Response {
    let session = match require(&state, Some(RoleKind::Admin), "/cameras") { Ok(s) => s, Err(r) => return r };
    match state.catalog.update_camera(&session, &id, patch) {
        Ok(camera) => Json(json!({"status":"ok","camera": camera})).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Deleting a camera also revokes it from every client that was entitled to it.
async fn remove_camera(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let session = match require(&state, Some(RoleKind::Admin), "/cameras") { Ok(s) => s, Err(r) => return r };
    let camera = match state.catalog.remove_camera(&session, &id) { Ok(c) => c, Err(e) => return e.into_response() };
    let revoked = state.directory.revoke_camera(&id);
    for client in &revoked {
        refresh_if_current(&state, client).await;
    }
    info!(target: "camwatch::server", "camera {} removed, revoked from {} client(s)", id, revoked.len());
    Json(json!({"status":"ok","removed": camera,"revoked_from": revoked})).into_response()
}

async fn list_alerts(State(state): State<AppState>) -> Response {
    let session = match require(&state, None, "/alerts") { Ok(s) => s, Err(r) => return r };
    Json(json!({"status":"ok","alerts": state.catalog.alerts(&session)})).into_response()
}

#[derive(Debug, Deserialize)]
struct AlertStatusPayload { status: AlertStatus }

async fn set_alert_status(State(state): State<AppState>, Path(id): Path<String>, Json(payload): Json<AlertStatusPayload>) -> Response {
    let session = match require(&state, None, "/alerts") { Ok(s) => s, Err(r) => return r };
    match state.catalog.update_alert_status(&session, &id, payload.status) {
        Ok(true) => Json(json!({"status":"ok"})).into_response(),
        Ok(false) => AppError::not_found("alert_not_found".to_string(), format!("no alert {id}")).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn list_users(State(state): State<AppState>) -> Response {
    if let Err(r) = require(&state, Some(RoleKind::Admin), "/users") { return r; }
    Json(json!({"status":"ok","users": state.directory.list()})).into_response()
}

#[derive(Debug, Deserialize)]
struct NewUserPayload {
    name: String,
    email: String,
    role: String,
    #[serde(default, rename = "assignedCameras")]
    assigned_cameras: Vec<String>,
    #[serde(default)]
    password: Option<String>,
}

async fn add_user(State(state): State<AppState>, Json(payload): Json<NewUserPayload>) -> Response {
    if let Err(r) = require(&state, Some(RoleKind::Admin), "/users") { return r; }
    let role = match RoleKind::parse(&payload.role) {
        Some(RoleKind::Admin) => Role::Admin,
        Some(RoleKind::Client) => Role::client(payload.assigned_cameras),
        None => return AppError::user("invalid_role".to_string(), format!("unknown role '{}'", payload.role)).into_response(),
    };
    let user = NewUser { display_name: payload.name, email: payload.email, role, password: payload.password };
    match state.directory.add_user(user) {
        Ok(identity) => (StatusCode::CREATED, Json(json!({"status":"ok","user": identity}))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// The signed-in identity was edited or removed: pick the change up now.
async fn refresh_if_current(state: &AppState, id: &str) {
    let is_current = state.session.snapshot().identity.map(|i| i.id == id).unwrap_or(false);
    if !is_current { return; }
    if let Err(e) = state.auth.refresh_profile().await {
        error!(target: "camwatch::server", "refresh after user change failed: {e}");
    }
}

#[derive(Debug, Deserialize)]
struct UpdateUserPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default, rename = "assignedCameras")]
    assigned_cameras: Option<Vec<String>>,
}

async fn update_user(State(state): State<AppState>, Path(id): Path<String>, Json(payload): Json<UpdateUserPayload>) -> Response {
    if let Err(r) = require(&state, Some(RoleKind::Admin), "/users") { return r; }
    let role = match payload.role.as_deref() {
        None => None,
        Some(r) => match RoleKind::parse(r) {
            Some(RoleKind::Admin) => Some(Role::Admin),
            Some(RoleKind::Client) => {
                // keep a client's cameras unless a new list is given
                let cameras = payload.assigned_cameras.clone().unwrap_or_else(|| {
                    state.directory.get(&id).and_then(|u| u.entitlements().map(|e| e.iter().cloned().collect())).unwrap_or_default()
                });
                Some(Role::client(cameras))
            }
            None => return AppError::user("invalid_role".to_string(), format!("unknown role '{r}'")).into_response(),
        },
    };
    let reassign = if role.is_none() { payload.assigned_cameras } else { None };
    let update = UserUpdate { display_name: payload.name, email: payload.email, role };
    let mut identity = match state.directory.update_user(&id, update) { Ok(u) => u, Err(e) => return e.into_response() };
    if let Some(cameras) = reassign {
        identity = match state.directory.assign_cameras(&id, cameras.into_iter().collect()) { Ok(u) => u, Err(e) => return e.into_response() };
    }
    refresh_if_current(&state, &id).await;
    Json(json!({"status":"ok","user": identity})).into_response()
}

#[derive(Debug, Deserialize)]
struct PasswordPayload { password: String }

async fn set_password(State(state): State<AppState>, Path(id): Path<String>, Json(payload): Json<PasswordPayload>) -> Response {
    if let Err(r) = require(&state, Some(RoleKind::Admin), "/users") { return r; }
    match state.directory.set_password(&id, &payload.password) {
        Ok(()) => Json(json!({"status":"ok"})).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn remove_user(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if let Err(r) = require(&state, Some(RoleKind::Admin), "/users") { return r; }
    match state.directory.remove_user(&id) {
        Ok(identity) => {
            refresh_if_current(&state, &id).await;
            Json(json!({"status":"ok","removed": identity})).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct AssignPayload { cameras: BTreeSet<String> }

async fn assign_cameras(State(state): State<AppState>, Path(id): Path<String>, Json(payload): Json<AssignPayload>) -> Response {
    if let Err(r) = require(&state, Some(RoleKind::Admin), "/users") { return r; }
    match state.directory.assign_cameras(&id, payload.cameras) {
        Ok(identity) => {
            refresh_if_current(&state, &id).await;
            Json(json!({"status":"ok","user": identity})).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn get_preferences(State(state): State<AppState>) -> Response {
    let prefs = Preferences::load(state.storage.as_ref());
    Json(json!({"status":"ok","preferences": prefs,"direction": prefs.language.direction()})).into_response()
}

#[derive(Debug, Deserialize)]
struct PreferencesPayload {
    #[serde(default)]
    theme: Option<Theme>,
    #[serde(default)]
    language: Option<Language>,
}

async fn put_preferences(State(state): State<AppState>, Json(payload): Json<PreferencesPayload>) -> Response {
    let mut prefs = Preferences::load(state.storage.as_ref());
    if let Some(t) = payload.theme { prefs.theme = t; }
    if let Some(l) = payload.language { prefs.language = l; }
    match prefs.save(state.storage.as_ref()) {
        Ok(()) => Json(json!({"status":"ok","preferences": prefs})).into_response(),
        Err(e) => AppError::io("preferences_write_failed".to_string(), e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct TranslateQuery {
    #[serde(default)]
    lang: Option<Language>,
}

async fn get_translation(State(state): State<AppState>, Path(key): Path<String>, Query(q): Query<TranslateQuery>) -> Response {
    let Some(mk) = MessageKey::parse(&key) else {
        return AppError::not_found("unknown_message_key".to_string(), format!("no message '{key}'")).into_response();
    };
    let lang = q.lang.unwrap_or_else(|| Preferences::load(state.storage.as_ref()).language);
    Json(json!({"status":"ok","key": key,"lang": lang,"text": translate(mk, lang)})).into_response()
}
