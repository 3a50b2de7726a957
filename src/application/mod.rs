// Application layer - Services coordinating channels, camera, and timeline
pub mod camera_animator;
pub mod channel_manager;
pub mod flight_router;
pub mod timeline_mapper;
