// HTTP request handlers - the render-surface interface
use crate::domain::telemetry::{LaunchCommand, Position3D};
use crate::domain::timeline::EventMarker;
use crate::domain::topic::Topic;
use crate::domain::trajectory::ALTITUDE_SERIES;
use crate::presentation::app_state::AppState;
use crate::presentation::stream::ndjson_stream;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

#[derive(Serialize)]
pub struct TrajectoryResponse {
    pub positions: Vec<Position3D>,
    pub altitude_series: Vec<f64>,
}

/// Full trajectory polyline plus the de-duplicated altitude series.
pub async fn get_trajectory(State(state): State<Arc<AppState>>) -> Json<TrajectoryResponse> {
    let trajectory = state.trajectory.read();
    Json(TrajectoryResponse {
        positions: trajectory.snapshot().to_vec(),
        altitude_series: trajectory.scalar_series(ALTITUDE_SERIES).to_vec(),
    })
}

/// Stream trajectory growth as NDJSON: everything buffered so far first,
/// then each new position as it arrives.
pub async fn stream_trajectory(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let manager = state.manager.clone();
    let trajectory = state.trajectory.clone();

    let positions = async_stream::stream! {
        let mut notifications = manager.subscribe();
        let mut sent = 0usize;
        loop {
            let pending: Vec<Position3D> = {
                let trajectory = trajectory.read();
                // A shrunk buffer means the mission was reset; start over.
                if trajectory.len() < sent {
                    sent = 0;
                }
                trajectory.snapshot()[sent..].to_vec()
            };
            sent += pending.len();
            for position in pending {
                yield position;
            }
            match notifications.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    };

    ndjson_stream(positions)
}

/// Latest committed/interpolated camera pose, or 204 before the first target.
pub async fn get_camera(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.camera.current_frame() {
        Some(frame) => Json(frame).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[derive(Serialize)]
pub struct TimelineResponse {
    pub now_position: f64,
    pub auto_track_enabled: bool,
    pub last_user_scroll_at: Option<chrono::DateTime<chrono::Utc>>,
    pub launch_relative: Option<String>,
    pub markers: Vec<EventMarker>,
}

/// Event markers and the now-marker on the normalized timeline scale.
pub async fn get_timeline(State(state): State<Arc<AppState>>) -> Json<TimelineResponse> {
    Json(TimelineResponse {
        now_position: state.timeline.now_position(),
        auto_track_enabled: state.timeline.auto_track_enabled(),
        last_user_scroll_at: state.timeline.last_user_scroll_at(),
        launch_relative: state.timeline.launch_relative(),
        markers: state.timeline.markers(),
    })
}

/// Connection state of every channel, for the link-status panel.
pub async fn get_channels(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.manager.statuses())
}

/// Report a user-originated scroll on the timeline viewport.
pub async fn timeline_scroll(State(state): State<Arc<AppState>>) -> StatusCode {
    state.timeline.notice_user_scroll();
    StatusCode::NO_CONTENT
}

/// Latest raw payload for one topic, or 404 when nothing has arrived.
pub async fn latest_snapshot(
    Path(topic): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let Some(topic) = Topic::parse(&topic) else {
        return (StatusCode::NOT_FOUND, "unknown topic").into_response();
    };
    match state.manager.latest_snapshot(topic) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Send a launch command on the command topic. Accepted unconditionally:
/// a channel that is not open drops the frame, by contract.
pub async fn send_command(
    State(state): State<Arc<AppState>>,
    Json(command): Json<LaunchCommand>,
) -> impl IntoResponse {
    match serde_json::to_string(&command) {
        Ok(payload) => {
            state.timeline.set_launch_date(command.launch_date);
            state.manager.send(Topic::Command, payload).await;
            StatusCode::ACCEPTED.into_response()
        }
        Err(err) => {
            tracing::error!(%err, "failed to serialize launch command");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Serialize)]
pub struct MediaResponse {
    pub live_stream_url: String,
}

/// Opaque media relay URL for the video feed, when configured.
pub async fn media_url(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.live_stream_url {
        Some(url) => Json(MediaResponse {
            live_stream_url: url.clone(),
        })
        .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
