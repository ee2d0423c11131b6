pub mod auth_policy;

pub use auth_policy::{credentials_gate, CredentialsGateState};
