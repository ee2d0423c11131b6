//! Path rewriting between the local mount and the upstream target.
//!
//! # Responsibilities
//! - Derive the default rule that strips `<pathPrefix><route>` from requests
//! - Compile explicitly configured rules
//! - Apply rules to a path-and-query and join the result onto the target path
//!
//! # Design Decisions
//! - Rules are ordered; the first rule whose pattern matches wins
//! - A rule replaces only its first match
//! - Consecutive slashes produced by joining are collapsed

use std::borrow::Cow;

use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use crate::proxy::error::{ProxyError, ProxyResult};

/// One compiled `pattern → replacement` rule.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pattern: Regex,
    replacement: String,
}

impl RewriteRule {
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Ordered, non-empty list of rewrite rules for a route.
#[derive(Debug, Clone)]
pub struct PathRewrite {
    rules: Vec<RewriteRule>,
}

impl PathRewrite {
    /// The rule used when a route does not configure `pathRewrite`.
    pub fn derived(route: &str, path_prefix: &str) -> ProxyResult<Self> {
        let pattern = default_rewrite_pattern(path_prefix, route);
        let compiled = Regex::new(&pattern).map_err(|e| {
            ProxyError::invalid(route, format!("Invalid path rewrite for route '{}': {}", route, e))
        })?;

        Ok(Self {
            rules: vec![RewriteRule {
                pattern: compiled,
                replacement: "/".to_string(),
            }],
        })
    }

    /// Compile explicitly configured rules, keeping their configured order.
    pub fn configured(route: &str, rules: &Map<String, Value>) -> ProxyResult<Self> {
        let mut compiled = Vec::with_capacity(rules.len());

        for (pattern, replacement) in rules {
            let Value::String(replacement) = replacement else {
                return Err(ProxyError::invalid(
                    route,
                    format!(
                        "Path rewrite replacement for pattern '{}' in route '{}' must be a string",
                        pattern, route
                    ),
                ));
            };
            let regex = Regex::new(pattern).map_err(|e| {
                ProxyError::invalid(
                    route,
                    format!("Invalid path rewrite pattern '{}' for route '{}': {}", pattern, route, e),
                )
            })?;
            compiled.push(RewriteRule {
                pattern: regex,
                replacement: replacement.clone(),
            });
        }

        if compiled.is_empty() {
            return Err(ProxyError::invalid(
                route,
                format!("Path rewrite for route '{}' must contain at least one rule", route),
            ));
        }

        Ok(Self { rules: compiled })
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Rewrite `path_and_query` with the first matching rule.
    pub fn apply<'a>(&self, path_and_query: &'a str) -> Cow<'a, str> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(path_and_query))
            .map(|rule| rule.pattern.replace(path_and_query, rule.replacement.as_str()))
            .unwrap_or(Cow::Borrowed(path_and_query))
    }
}

/// Regex matching `<pathPrefix><route>/` with an optional trailing slash,
/// with exactly one `/` between prefix and route.
pub fn default_rewrite_pattern(path_prefix: &str, route: &str) -> String {
    let mut route_with_slash = if route.ends_with('/') {
        route.to_string()
    } else {
        format!("{}/", route)
    };

    if !path_prefix.ends_with('/') && !route_with_slash.starts_with('/') {
        route_with_slash.insert(0, '/');
    } else if path_prefix.ends_with('/') && route_with_slash.starts_with('/') {
        route_with_slash.remove(0);
    }

    format!(
        "^{}{}?",
        regex::escape(path_prefix),
        regex::escape(&route_with_slash)
    )
}

/// Join a rewritten path-and-query onto the target URL's path.
pub fn join_target_path(target: &Url, rewritten: &str) -> String {
    let (path, query) = match rewritten.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rewritten, None),
    };

    let mut joined = String::with_capacity(target.path().len() + path.len() + 1);
    for ch in target.path().chars().chain(std::iter::once('/')).chain(path.chars()) {
        if ch == '/' && joined.ends_with('/') {
            continue;
        }
        joined.push(ch);
    }

    let query = match (target.query(), query) {
        (Some(t), Some(q)) if !t.is_empty() => Some(format!("{}&{}", t, q)),
        (Some(t), None) => Some(t.to_string()),
        (_, q) => q.map(str::to_string),
    };

    match query {
        Some(q) => format!("{}?{}", joined, q),
        None => joined,
    }
}
