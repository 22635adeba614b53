//!
//! camwatch catalog
//! ----------------
//! Camera and alert records behind the dashboard views. Every read is scoped through the
//! access filter, so a client only ever gets cameras it is entitled to and alerts raised
//! by those cameras. The fixture set mirrors the demo installation: five cameras spread
//! over three buildings and four alerts.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::identity::{find_visible, visible_resources, Resource, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraStatus { Online, Offline, Warning }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType { Fire, Crowd, Weapon, Violence }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus { New, Acknowledged, Resolved }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastAlert {
    #[serde(rename = "type")]
    pub kind: AlertType,
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub id: String,
    pub name: String,
    pub location: String,
    pub stream_url: String,
    pub status: CameraStatus,
    /// Directory id of the owning client.
    pub client_id: String,
    #[serde(default)]
    pub last_alert: Option<LastAlert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub camera_id: String,
    pub camera_name: String,
    #[serde(rename = "type")]
    pub kind: AlertType,
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
    pub status: AlertStatus,
    pub thumbnail: String,
}

impl Resource for Camera {
    fn id(&self) -> &str { &self.id }
    fn entitlement_key(&self) -> &str { &self.id }
}

impl Resource for Alert {
    fn id(&self) -> &str { &self.id }
    fn entitlement_key(&self) -> &str { &self.camera_id }
}

#[derive(Default)]
pub struct Catalog {
    cameras: RwLock<Vec<Camera>>,
    alerts: RwLock<Vec<Alert>>,
}

fn cam(id: &str, name: &str, location: &str, stream_url: &str, status: CameraStatus, client_id: &str, last_alert: Option<LastAlert>) -> Camera {
    Camera {
        id: id.into(),
        name: name.into(),
        location: location.into(),
        stream_url: stream_url.into(),
        status,
        client_id: client_id.into(),
        last_alert,
    }
}

#[allow(clippy::too_many_arguments)]
fn alert(id: &str, camera_id: &str, camera_name: &str, kind: AlertType, at: DateTime<Utc>, confidence: f32, status: AlertStatus, thumbnail: &str) -> Alert {
    Alert {
        id: id.into(),
        camera_id: camera_id.into(),
        camera_name: camera_name.into(),
        kind,
        timestamp: at,
        confidence,
        status,
        thumbnail: thumbnail.into(),
    }
}

impl Catalog {
    pub fn new(cameras: Vec<Camera>, alerts: Vec<Alert>) -> Self {
        Self { cameras: RwLock::new(cameras), alerts: RwLock::new(alerts) }
    }

    /// Demo data; alert times are relative to `now`.
    pub fn with_fixtures_at(now: DateTime<Utc>) -> Self {
        let mins = |m: i64| now - Duration::minutes(m);
        let cameras = vec![
            cam("camera-1", "Main Entrance", "Building A", "https://picsum.photos/800/450", CameraStatus::Online, "2",
                Some(LastAlert { kind: AlertType::Crowd, timestamp: mins(15), confidence: 0.92 })),
            cam("camera-2", "Parking Lot", "Building A", "https://picsum.photos/800/450?random=1", CameraStatus::Online, "2", None),
            cam("camera-3", "Server Room", "Building B", "https://picsum.photos/800/450?random=2", CameraStatus::Warning, "3",
                Some(LastAlert { kind: AlertType::Fire, timestamp: mins(5), confidence: 0.87 })),
            cam("camera-4", "Main Entrance", "Building B", "https://picsum.photos/800/450?random=3", CameraStatus::Offline, "3", None),
            cam("camera-5", "Conference Room", "Building C", "https://picsum.photos/800/450?random=4", CameraStatus::Online, "4", None),
        ];
        let alerts = vec![
            alert("alert-1", "camera-1", "Main Entrance", AlertType::Crowd, mins(15), 0.92, AlertStatus::New, "https://picsum.photos/200/150?random=1"),
            alert("alert-2", "camera-3", "Server Room", AlertType::Fire, mins(5), 0.87, AlertStatus::Acknowledged, "https://picsum.photos/200/150?random=2"),
            alert("alert-3", "camera-2", "Parking Lot", AlertType::Weapon, mins(120), 0.75, AlertStatus::Resolved, "https://picsum.photos/200/150?random=3"),
            alert("alert-4", "camera-1", "Main Entrance", AlertType::Violence, mins(180), 0.83, AlertStatus::Resolved, "https://picsum.photos/200/150?random=4"),
        ];
        Self::new(cameras, alerts)
    }

    pub fn with_fixtures() -> Self { Self::with_fixtures_at(Utc::now()) }

    pub fn cameras(&self, session: &Session) -> Vec<Camera> {
        let all = self.cameras.read();
        visible_resources(session, all.as_slice()).into_iter().cloned().collect()
    }

    pub fn camera(&self, session: &Session, id: &str) -> Option<Camera> {
        let all = self.cameras.read();
        find_visible(session, all.as_slice(), id).cloned()
    }

    pub fn alerts(&self, session: &Session) -> Vec<Alert> {
        let all = self.alerts.read();
        visible_resources(session, all.as_slice()).into_iter().cloned().collect()
    }

    /// Triage an alert. Returns `Ok(false)` for unknown alerts and for alerts the
    /// session cannot see; moving an alert back to `new` is rejected.
    pub fn update_alert_status(&self, session: &Session, alert_id: &str, status: AlertStatus) -> AppResult<bool> {
        if status == AlertStatus::New {
            return Err(AppError::user("invalid_status", "alerts can only be acknowledged or resolved"));
        }
        let mut all = self.alerts.write();
        let Some(alert) = all.iter_mut().find(|a| a.id == alert_id) else { return Ok(false) };
        if !session.identity.as_ref().map(|i| i.role.permits(&alert.camera_id)).unwrap_or(false) {
            return Ok(false);
        }
        debug!(target: "camwatch::catalog", "alert {} status {:?} -> {:?}", alert_id, alert.status, status);
        alert.status = status;
        Ok(true)
    }

    /// Register a camera. Admin only; ids are unique.
    pub fn add_camera(&self, session: &Session, camera: Camera) -> AppResult<Camera> {
        if !session.is_admin() {
            return Err(AppError::forbidden("admin_required", "only administrators can add cameras"));
        }
        if camera.id.trim().is_empty() || camera.name.trim().is_empty() {
            return Err(AppError::user("invalid_camera", "camera id and name are required"));
        }
        let mut all = self.cameras.write();
        if all.iter().any(|c| c.id == camera.id) {
            return Err(AppError::conflict("duplicate_camera".to_string(), format!("camera already exists: {}", camera.id)));
        }
        all.push(camera.clone());
        Ok(camera)
    }

    /// Register a camera under the next free `camera-N` id. New cameras start offline
    /// until their stream reports in.
    pub fn create_camera(&self, session: &Session, new: NewCamera) -> AppResult<Camera> {
        if !session.is_admin() {
            return Err(AppError::forbidden("admin_required", "only administrators can add cameras"));
        }
        let new = new.validated()?;
        let mut all = self.cameras.write();
        let next = all
            .iter()
            .filter_map(|c| c.id.strip_prefix("camera-").and_then(|n| n.parse::<u64>().ok()))
            .max()
            .unwrap_or(0)
            + 1;
        let camera = Camera {
            id: format!("camera-{next}"),
            name: new.name,
            location: new.location,
            stream_url: new.stream_url,
            status: CameraStatus::Offline,
            client_id: new.client_id,
            last_alert: None,
        };
        debug!(target: "camwatch::catalog", "camera {} registered for client {}", camera.id, camera.client_id);
        all.push(camera.clone());
        Ok(camera)
    }

    /// Edit a camera's name, location or stream. Admin only. Alerts keep a copy of the
    /// camera name, so a rename is carried over to them.
    pub fn update_camera(&self, session: &Session, id: &str, patch: CameraPatch) -> AppResult<Camera> {
        if !session.is_admin() {
            return Err(AppError::forbidden("admin_required", "only administrators can edit cameras"));
        }
        let patch = patch.trimmed()?;
        let mut cameras = self.cameras.write();
        let camera = cameras
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::not_found("camera_not_found".to_string(), format!("no camera {id}")))?;
        if let Some(location) = patch.location { camera.location = location; }
        if let Some(url) = patch.stream_url { camera.stream_url = url; }
        if let Some(name) = patch.name {
            for a in self.alerts.write().iter_mut().filter(|a| a.camera_id == id) {
                a.camera_name = name.clone();
            }
            camera.name = name;
        }
        Ok(camera.clone())
    }

    /// Delete a camera together with the alerts it raised. Admin only. Entitlements that
    /// name the camera live in the directory and are revoked by the caller.
    pub fn remove_camera(&self, session: &Session, id: &str) -> AppResult<Camera> {
        if !session.is_admin() {
            return Err(AppError::forbidden("admin_required", "only administrators can delete cameras"));
        }
        let mut cameras = self.cameras.write();
        let pos = cameras
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| AppError::not_found("camera_not_found".to_string(), format!("no camera {id}")))?;
        let removed = cameras.remove(pos);
        let mut alerts = self.alerts.write();
        let before = alerts.len();
        alerts.retain(|a| a.camera_id != id);
        debug!(target: "camwatch::catalog", "camera {} removed with {} alert(s)", id, before - alerts.len());
        Ok(removed)
    }

    /// Counts for the dashboard summary cards, over what the session can see.
    pub fn summary(&self, session: &Session) -> CatalogSummary {
        let cameras = self.cameras(session);
        let alerts = self.alerts(session);
        CatalogSummary {
            cameras_total: cameras.len(),
            cameras_online: cameras.iter().filter(|c| c.status == CameraStatus::Online).count(),
            alerts_open: alerts.iter().filter(|a| a.status != AlertStatus::Resolved).count(),
            alerts_new: alerts.iter().filter(|a| a.status == AlertStatus::New).count(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCamera {
    pub name: String,
    pub location: String,
    pub stream_url: String,
    /// Directory id of the owning client.
    pub client_id: String,
}

impl NewCamera {
    fn validated(self) -> AppResult<Self> {
        let v = Self {
            name: self.name.trim().to_string(),
            location: self.location.trim().to_string(),
            stream_url: self.stream_url.trim().to_string(),
            client_id: self.client_id.trim().to_string(),
        };
        if v.name.is_empty() || v.location.is_empty() || v.stream_url.is_empty() || v.client_id.is_empty() {
            return Err(AppError::user("invalid_camera", "name, location, stream_url and client_id are required"));
        }
        Ok(v)
    }
}

/// Fields left `None` are unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub stream_url: Option<String>,
}

impl CameraPatch {
    fn trimmed(self) -> AppResult<Self> {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        let p = Self { name: trim(self.name), location: trim(self.location), stream_url: trim(self.stream_url) };
        if [&p.name, &p.location, &p.stream_url].iter().any(|f| f.as_deref() == Some("")) {
            return Err(AppError::user("invalid_camera", "camera fields cannot be blank"));
        }
        Ok(p)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub cameras_total: usize,
    pub cameras_online: usize,
    pub alerts_open: usize,
    pub alerts_new: usize,
}
