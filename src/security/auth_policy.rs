//! Registration of per-path authentication policies.
//!
//! The proxy never evaluates credentials itself. It only tells the HTTP layer
//! which paths may be reached without them; the credentials gate in
//! `http::middleware::auth_policy` consults the live set at request time.
//!
//! Routes register into an [`AuthPolicyBatch`] owned by a single table build.
//! The live [`AuthPolicies`] set is replaced wholesale whenever a built table
//! is installed, so exemptions never outlive the route that declared them.

use std::sync::{Mutex, RwLock};

use crate::routing::matcher::MountMatcher;

/// What a registered path allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicyAllow {
    Unauthenticated,
}

/// A path-scoped authentication exemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPolicy {
    /// Path relative to the proxy mount point.
    pub path: String,
    pub allow: AuthPolicyAllow,
}

/// Capability for registering authentication policies with the HTTP layer.
pub trait AuthPolicyRegistry: Send + Sync {
    fn add_auth_policy(&self, policy: AuthPolicy);
}

/// Policies registered by the routes of one table build.
#[derive(Debug, Default)]
pub struct AuthPolicyBatch {
    policies: Mutex<Vec<AuthPolicy>>,
}

impl AuthPolicyBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_policies(self) -> Vec<AuthPolicy> {
        self.policies
            .into_inner()
            .expect("auth policy batch mutex poisoned")
    }
}

impl AuthPolicyRegistry for AuthPolicyBatch {
    fn add_auth_policy(&self, policy: AuthPolicy) {
        let mut policies = self.policies.lock().expect("auth policy batch mutex poisoned");
        // Duplicate mount paths register the same exemption.
        if !policies.contains(&policy) {
            policies.push(policy);
        }
    }
}

/// Live exemption set backing the credentials gate.
#[derive(Debug, Default)]
pub struct AuthPolicies {
    unauthenticated: RwLock<Vec<MountMatcher>>,
}

impl AuthPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `path` (relative to the proxy mount) is exempt from credentials.
    pub fn allows_unauthenticated(&self, path: &str) -> bool {
        self.unauthenticated
            .read()
            .expect("auth policy lock poisoned")
            .iter()
            .any(|m| m.strip(path).is_some())
    }

    /// Install the policies of a newly applied table, dropping all others.
    pub fn replace(&self, policies: &[AuthPolicy]) {
        let unauthenticated: Vec<MountMatcher> = policies
            .iter()
            .filter(|p| p.allow == AuthPolicyAllow::Unauthenticated)
            .map(|p| MountMatcher::new(&p.path))
            .collect();

        tracing::debug!(
            unauthenticated = unauthenticated.len(),
            "Installed authentication policies"
        );
        *self
            .unauthenticated
            .write()
            .expect("auth policy lock poisoned") = unauthenticated;
    }

    pub fn len(&self) -> usize {
        self.unauthenticated
            .read()
            .expect("auth policy lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
