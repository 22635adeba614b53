//! Route guard and the dashboard's route table.
//!
//! `evaluate` is a pure function of the session and a route's required role, so it is
//! safe to call on every navigation. `navigate` resolves a path first and then applies it.

use serde::Serialize;
use crate::identity::{RoleKind, Session};

pub const LOGIN_PATH: &str = "/login";
/// Landing route for signed-in users who hit a route their role does not allow.
pub const DEFAULT_PATH: &str = "/dashboard";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RouteDecision {
    /// Session still restoring; render a placeholder, do not redirect.
    Loading,
    Allowed,
    /// `from` is the originally requested location, kept for post-login return.
    RedirectLogin { from: String },
    RedirectDefault { to: String },
}

pub fn evaluate(session: &Session, required: Option<RoleKind>, requested: &str) -> RouteDecision {
    if session.is_pending() {
        return RouteDecision::Loading;
    }
    let Some(identity) = session.identity.as_ref() else {
        return RouteDecision::RedirectLogin { from: requested.to_string() };
    };
    match required {
        Some(role) if identity.role.kind() != role => RouteDecision::RedirectDefault { to: DEFAULT_PATH.to_string() },
        _ => RouteDecision::Allowed,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
    /// `/` always forwards to the login page.
    Root,
    Login,
    Dashboard,
    Cameras,
    CameraDetail { id: String },
    Alerts,
    Users,
    Settings,
    NotFound,
}

impl Route {
    pub fn resolve(path: &str) -> Route {
        // tolerate "#/cameras", query strings and a trailing slash
        let p = path.trim().trim_start_matches('#');
        let p = p.split(['?', '#']).next().unwrap_or("");
        let p = if p.len() > 1 { p.trim_end_matches('/') } else { p };
        match p {
            "" | "/" => Route::Root,
            "/login" => Route::Login,
            "/dashboard" => Route::Dashboard,
            "/cameras" => Route::Cameras,
            "/alerts" => Route::Alerts,
            "/users" => Route::Users,
            "/settings" => Route::Settings,
            other => match other.strip_prefix("/camera/") {
                Some(id) if !id.is_empty() && !id.contains('/') => Route::CameraDetail { id: id.to_string() },
                _ => Route::NotFound,
            },
        }
    }

    /// `None` for public routes, `Some(None)` for any signed-in identity,
    /// `Some(Some(role))` when a specific role is required.
    pub fn requirement(&self) -> Option<Option<RoleKind>> {
        match self {
            Route::Root | Route::Login | Route::NotFound => None,
            Route::Users => Some(Some(RoleKind::Admin)),
            Route::Dashboard | Route::Cameras | Route::CameraDetail { .. } | Route::Alerts | Route::Settings => Some(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub route: Route,
    pub decision: RouteDecision,
}

pub fn navigate(session: &Session, path: &str) -> Navigation {
    let route = Route::resolve(path);
    let decision = match (&route, route.requirement()) {
        (Route::Root, _) => RouteDecision::RedirectLogin { from: path.to_string() },
        (_, None) => RouteDecision::Allowed,
        (_, Some(required)) => evaluate(session, required, path),
    };
    Navigation { route, decision }
}
