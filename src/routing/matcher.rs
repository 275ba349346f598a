//! Route pattern matching.
//!
//! # Responsibilities
//! - Parse a pattern string into literal and parameter segments
//! - Match a request path against a pattern, segment by segment
//! - Extract named parameters for the matched route
//!
//! # Design Decisions
//! - Pattern and path are split on `/` the same way, so a leading slash
//!   produces an empty first segment on both sides
//! - Segment counts must be equal; there is no catch-all segment
//! - A parameter binds exactly one non-empty segment
//! - No regex, no type constraints: every parameter is an opaque string
//! - Duplicate parameter names: the last occurrence wins

use std::cmp::Ordering;
use std::collections::HashMap;

/// Leading marker that turns a pattern segment into a capture.
pub const PARAM_SENTINEL: char = ':';

/// Parameters extracted from a matched path, keyed by name.
pub type Params = HashMap<String, String>;

/// A single `/`-delimited component of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment byte for byte.
    Literal(String),
    /// Binds the request segment to this name.
    Param(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix(PARAM_SENTINEL) {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(raw.to_string()),
        }
    }

    fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }
}

/// A parsed route pattern such as `/hello/:name/from/:addr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a pattern string. Parsing never fails; every segment is either a
    /// literal or a parameter.
    pub fn parse(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let segments = raw.split('/').map(Segment::parse).collect();
        Self { raw, segments }
    }

    /// The pattern exactly as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Names declared more than once in this pattern.
    pub fn duplicate_params(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        let mut dupes = Vec::new();
        for name in self.param_names() {
            if seen.contains(&name) {
                if !dupes.contains(&name) {
                    dupes.push(name);
                }
            } else {
                seen.push(name);
            }
        }
        dupes
    }

    /// Match a request path, returning the bound parameters on success.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), part.to_string());
                }
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
            }
        }

        Some(params)
    }

    /// Orders patterns by specificity: at the first position where the two
    /// patterns disagree on segment kind, the literal one ranks first.
    /// `Ordering::Less` means `self` is more specific.
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.segments.iter().zip(&other.segments) {
            match (a.is_literal(), b.is_literal()) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
        }
        Ordering::Equal
    }
}

impl std::fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One-shot form of [`RoutePattern::matches`].
pub fn match_pattern(pattern: &str, path: &str) -> Option<Params> {
    RoutePattern::parse(pattern).matches(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binds_params_by_position() {
        let params = match_pattern("/hello/:name/from/:addr", "/hello/alice/from/paris").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params["name"], "alice");
        assert_eq!(params["addr"], "paris");
    }

    #[test]
    fn test_literal_only_match_has_no_params() {
        let params = match_pattern("/users/list", "/users/list").unwrap();
        assert!(params.is_empty());
        assert!(match_pattern("/", "/").unwrap().is_empty());
    }

    #[test]
    fn test_segment_count_mismatch_never_matches() {
        assert!(match_pattern("/users/:id", "/users").is_none());
        assert!(match_pattern("/users/:id", "/users/1/posts").is_none());
        assert!(match_pattern("/:a/:b", "/x").is_none());
        // Trailing slash adds an empty segment.
        assert!(match_pattern("/users", "/users/").is_none());
    }

    #[test]
    fn test_literal_mismatch() {
        assert!(match_pattern("/users/:id", "/posts/1").is_none());
        // Case-sensitive, byte-equal comparison.
        assert!(match_pattern("/Users/:id", "/users/1").is_none());
    }

    #[test]
    fn test_param_rejects_empty_segment() {
        assert!(match_pattern("/users/:id", "/users/").is_none());
    }

    #[test]
    fn test_params_are_opaque_strings() {
        let params = match_pattern("/items/:id", "/items/not-a-number.json").unwrap();
        assert_eq!(params["id"], "not-a-number.json");
    }

    #[test]
    fn test_duplicate_param_last_wins() {
        let pattern = RoutePattern::parse("/:id/x/:id");
        assert_eq!(pattern.duplicate_params(), vec!["id"]);
        let params = pattern.matches("/first/x/second").unwrap();
        assert_eq!(params["id"], "second");
    }

    #[test]
    fn test_specificity_prefers_literal() {
        let literal = RoutePattern::parse("/users/new");
        let param = RoutePattern::parse("/users/:id");
        assert_eq!(literal.specificity_cmp(&param), Ordering::Less);
        assert_eq!(param.specificity_cmp(&literal), Ordering::Greater);
        assert_eq!(param.specificity_cmp(&RoutePattern::parse("/posts/:id")), Ordering::Equal);
    }
}
