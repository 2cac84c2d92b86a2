use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use tracing::error;

use crate::error::Error;

/// Characters allowed in a reference. Anything outside this set could be
/// misread by the runtime, the router label parser, or DNS.
static VALID_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.\-+_/\\]+$").expect("reference pattern is valid"));

pub const INVALID_REFERENCE_MESSAGE: &str = "Invalid reference format. Only alphanumeric characters, hyphens, underscores, plus signs, dots, slashes, and backslashes are allowed.";

/// A validated deployment reference, such as a branch or tag name.
///
/// Used verbatim as the container name and as the image tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Reference(String);

impl Reference {
    /// Validate a raw reference against the allow-list.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        if !VALID_REFERENCE.is_match(raw) {
            error!(reference = %raw, "Invalid reference format");
            return Err(Error::InvalidReference(
                INVALID_REFERENCE_MESSAGE.to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// DNS-safe label for this reference.
    ///
    /// Distinct references may collapse onto the same label
    /// (`a/b` and `a.b` both become `a-b`).
    pub fn domain_label(&self) -> String {
        self.0
            .chars()
            .map(|c| match c {
                '/' | ':' | '.' | '\\' | '+' | '_' => '-',
                other => other,
            })
            .collect()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Reference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_allow_listed_references() {
        for raw in [
            "main",
            "feature/login_v2.1",
            "v1.0.0+build-7",
            r"windows\style",
            "UPPER-lower_09",
            ".",
        ] {
            let reference = Reference::parse(raw).expect("reference should be valid");
            assert_eq!(reference.as_str(), raw);
        }
    }

    #[test]
    fn test_rejects_everything_else() {
        for raw in [
            "",
            "has space",
            "$(whoami)",
            "a;rm -rf /",
            "`id`",
            "tag:latest",
            "quote\"",
            "main\n",
            "ümlaut",
            "a|b",
            "a&b",
        ] {
            let err = Reference::parse(raw).expect_err("reference should be rejected");
            assert!(matches!(err, Error::InvalidReference(ref msg) if msg == INVALID_REFERENCE_MESSAGE));
        }
    }

    #[test]
    fn test_domain_label() {
        let label = |raw: &str| Reference::parse(raw).unwrap().domain_label();

        assert_eq!(label("feature/login_v2.1"), "feature-login-v2-1");
        assert_eq!(label(r"a\b+c"), "a-b-c");
        assert_eq!(label("plain"), "plain");
        assert_eq!(label("already-dashed"), "already-dashed");
    }

    #[test]
    fn test_domain_label_collisions_are_possible() {
        let a = Reference::parse("a/b").unwrap();
        let b = Reference::parse("a.b").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.domain_label(), b.domain_label());
    }
}
