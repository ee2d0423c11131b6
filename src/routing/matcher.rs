//! Mount-path matching.
//!
//! # Responsibilities
//! - Match a request path against a route's mount path
//! - Return the remainder of the path below the mount point
//!
//! # Design Decisions
//! - Matching is case-insensitive and trailing-slash tolerant
//! - A mount path only matches at a segment boundary (`/a` never matches `/ab`)
//! - A missing leading slash is implied; `/` and `` match everything
//! - No regex, so matching is O(len(prefix))

/// Matches request paths that lie under a mount path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountMatcher {
    /// Lower-cased, leading slash, no trailing slash. Empty for the root.
    prefix: String,
}

impl MountMatcher {
    pub fn new(mount_path: &str) -> Self {
        let trimmed = mount_path.trim_end_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else if trimmed.starts_with('/') {
            trimmed.to_ascii_lowercase()
        } else {
            format!("/{}", trimmed.to_ascii_lowercase())
        };
        Self { prefix }
    }

    /// Returns the part of `path` below the mount point, or `None` if the
    /// path is not under it.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            return Some(path);
        }

        let head = path.get(..self.prefix.len())?;
        if !head.eq_ignore_ascii_case(&self.prefix) {
            return None;
        }

        let rest = &path[self.prefix.len()..];
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.strip(path).is_some()
    }
}
