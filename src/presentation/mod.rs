// Presentation layer - HTTP render-surface interface
pub mod app_state;
pub mod handlers;
pub mod stream;
