//! HTTP transport surface.

pub mod error;
pub mod extractors;
pub mod routes;

pub use routes::create_router;
