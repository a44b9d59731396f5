// Service modules (daemon functionality)
pub(crate) mod database;
pub mod http_server;
pub mod identity;
pub mod process;
pub mod service_config;
pub mod service_state;
pub mod sessions;
pub mod tasks;

// App state (configuration, paths)
pub mod state;

// Re-exports for consumers (CLI ops, tests)
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use service_config::Config as ServiceConfig;
pub use service_state::State as ServiceState;
pub use state::{AppConfig, AppState, StateError};
