// Domain layer - Core business models
pub mod camera;
pub mod telemetry;
pub mod timeline;
pub mod topic;
pub mod trajectory;
