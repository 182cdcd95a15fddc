//! HTTP layer: router, middleware, wire types, API errors

pub mod error;
pub mod middleware;
pub mod protocol;
pub mod routes;

pub use error::ApiError;
pub use routes::build_router;
