// Main entry point - Dependency injection, channel startup, and HTTP serve
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use parking_lot::RwLock;
use tower_http::trace::TraceLayer;

use crate::application::camera_animator::CameraAnimator;
use crate::application::channel_manager::ChannelManager;
use crate::application::flight_router::FlightDataRouter;
use crate::application::timeline_mapper::TimelineMapper;
use crate::domain::trajectory::TrajectoryStore;
use crate::infrastructure::config::load_service_config;
use crate::infrastructure::ws_transport::WsTransport;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_camera, get_channels, get_timeline, get_trajectory, health_check, latest_snapshot,
    media_url, send_command, stream_trajectory, timeline_scroll,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_service_config()?;

    // Channel manager on the websocket transport (infrastructure layer)
    let transport = Arc::new(WsTransport::new(config.telemetry.reconnect.clone()));
    let (manager, events) = ChannelManager::new(transport);
    let manager_task = tokio::spawn(Arc::clone(&manager).run(events));

    // Consumers (application layer)
    let trajectory = Arc::new(RwLock::new(TrajectoryStore::new()));
    let camera = CameraAnimator::new();
    let timeline = TimelineMapper::new();
    let timeline_task = Arc::clone(&timeline).run();

    // One live connection per configured topic
    for channel in &config.telemetry.channels {
        let endpoint = config.telemetry.endpoint(channel);
        manager.open(channel.topic, &endpoint).await?;
    }

    let router_task = tokio::spawn(
        FlightDataRouter::new(
            Arc::clone(&manager),
            Arc::clone(&trajectory),
            Arc::clone(&camera),
            Arc::clone(&timeline),
        )
        .run(),
    );

    // Application state for the render-surface interface
    let state = Arc::new(AppState {
        manager: Arc::clone(&manager),
        trajectory,
        camera: Arc::clone(&camera),
        timeline,
        live_stream_url: config.media.live_stream_url.clone(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/channels", get(get_channels))
        .route("/trajectory", get(get_trajectory))
        .route("/trajectory/stream", get(stream_trajectory))
        .route("/camera", get(get_camera))
        .route("/timeline", get(get_timeline))
        .route("/timeline/scroll", post(timeline_scroll))
        .route("/snapshot/:topic", get(latest_snapshot))
        .route("/command", post(send_command))
        .route("/media", get(media_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!(%addr, "starting mission-telemetry service");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Teardown: close every channel and stop the scheduled loops so no stale
    // callback outlives the owning scope.
    manager.close_all();
    camera.shutdown();
    timeline_task.abort();
    router_task.abort();
    manager_task.abort();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
    }
}
