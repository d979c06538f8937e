mod auth_state;
mod refresh_coordinator;
mod refresh_endpoint;
mod session_manager;

pub use auth_state::*;
pub use refresh_coordinator::*;
pub use refresh_endpoint::*;
pub use session_manager::*;
