//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Route configuration:
//!     → credentials.rs (parse credentials policy)
//!     → headers.rs (compute request/response allow-lists)
//!     → auth_policy.rs (register unauthenticated paths)
//!
//! Proxied traffic:
//!     → headers.rs (strip everything not allow-listed, both directions)
//! ```
//!
//! # Design Decisions
//! - Allow-list, never deny-list: unknown headers are dropped
//! - Credential headers travel only when a route opts into forwarding

pub mod auth_policy;
pub mod credentials;
pub mod headers;

pub use auth_policy::{AuthPolicies, AuthPolicy, AuthPolicyAllow, AuthPolicyRegistry};
pub use credentials::CredentialsPolicy;
pub use headers::{Direction, HeaderAllowList};
