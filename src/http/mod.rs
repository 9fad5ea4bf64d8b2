//! HTTP front end for the queue-paired relay.
//!
//! # Data Flow
//! ```text
//! PUT /compressions
//!     → handlers.rs (request body becomes the producer source)
//!     → relay::ProducerIntake
//!     → response.rs (200, or the relay error mapped to a status)
//!
//! GET /compressions
//!     → handlers.rs (claim the next admitted stream, or cancel on shutdown)
//!     → streaming response body
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
