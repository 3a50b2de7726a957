// Application state for HTTP handlers
use crate::application::camera_animator::CameraAnimator;
use crate::application::channel_manager::ChannelManager;
use crate::application::timeline_mapper::TimelineMapper;
use crate::domain::trajectory::TrajectoryStore;
use parking_lot::RwLock;
use std::sync::Arc;

pub struct AppState {
    pub manager: Arc<ChannelManager>,
    pub trajectory: Arc<RwLock<TrajectoryStore>>,
    pub camera: Arc<CameraAnimator>,
    pub timeline: Arc<TimelineMapper>,
    /// Opaque media relay URL, handed through unparsed.
    pub live_stream_url: Option<String>,
}
