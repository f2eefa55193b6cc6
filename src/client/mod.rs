//! Client Module
//!
//! Endpoint descriptors, the shared backend transport and the result
//! envelope mapper.

mod endpoints;
mod envelope;
mod transport;

// Re-export public types
pub use endpoints::{take_id, Endpoint, HttpMethod};
pub use envelope::{
    interpret, map_response, ActionResult, Envelope, PaginationLinks, PaginationMeta,
    RawResponse,
};
pub use transport::ApiClient;
