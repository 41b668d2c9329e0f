// ABOUTME: Wiring shared by the sandcraft binary: logging setup and service construction
// ABOUTME: Builds the orchestrator, GitHub service and agent from environment configuration

pub mod context;
pub mod logging;

pub use context::{sandbox_settings, AppContext};
pub use logging::init_logging;
