mod envelope;
mod http;
mod session;
mod token;
mod user;

pub use envelope::*;
pub use http::*;
pub use session::*;
pub use token::*;
pub use user::*;
