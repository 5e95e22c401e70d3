pub mod bootstrap;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

// Export structured error types
pub use error::{ApiError, ApiResult};
pub use middleware::{RequestContext, correlation_id_middleware};
pub use state::AppState;
