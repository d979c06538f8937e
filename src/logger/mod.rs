//! The `logger` module is a simple utility that requires manual verification.
//! See `bin/logger_demo.rs` for a demo binary that switches filters at runtime.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
