//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer stack)
//!     → request.rs (add request ID)
//!     → middleware/auth_policy.rs (credentials gate)
//!     → body.rs (optional JSON / form body parsing)
//!     → [proxy dispatcher forwards to the matched route]
//!     → Send to client
//! ```

pub mod body;
pub mod middleware;
pub mod request;
pub mod server;

pub use body::{parse_request_body, ConsumedBody};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
