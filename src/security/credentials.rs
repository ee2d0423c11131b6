//! Per-route credentials policy.

use std::fmt;
use std::str::FromStr;

/// How a proxy route treats caller credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CredentialsPolicy {
    /// Callers must be authenticated; their credentials are not forwarded.
    #[default]
    Require,
    /// Callers must be authenticated and `authorization` is forwarded upstream.
    Forward,
    /// The route accepts unauthenticated traffic.
    AllowUnauthenticated,
}

impl CredentialsPolicy {
    pub const ALL: [CredentialsPolicy; 3] = [
        CredentialsPolicy::Require,
        CredentialsPolicy::Forward,
        CredentialsPolicy::AllowUnauthenticated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialsPolicy::Require => "require",
            CredentialsPolicy::Forward => "forward",
            CredentialsPolicy::AllowUnauthenticated => "dangerously-allow-unauthenticated",
        }
    }

    /// Quoted, comma-separated list of accepted configuration values.
    pub fn expected_values() -> String {
        Self::ALL
            .iter()
            .map(|p| format!("'{}'", p.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for CredentialsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a configured value is not a known policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCredentialsPolicy(pub String);

impl FromStr for CredentialsPolicy {
    type Err = UnknownCredentialsPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownCredentialsPolicy(s.to_string()))
    }
}
