pub mod error;
pub mod handlers;
pub mod registry;
pub mod server;
pub mod ws;

pub use error::ApiError;
pub use registry::ConnectionRegistry;
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
