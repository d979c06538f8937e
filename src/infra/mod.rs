mod fake_backend;
mod file_token_store;
mod memory_token_store;
mod reqwest_transport;

pub use fake_backend::*;
pub use file_token_store::*;
pub use memory_token_store::*;
pub use reqwest_transport::*;
