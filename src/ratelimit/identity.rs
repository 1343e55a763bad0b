//! Caller identity used as the rate limit bucket key.

use std::fmt;

/// An opaque key identifying a caller.
///
/// Usually the client's apparent IP address, but the value is never
/// validated: any string is a distinct bucket, and equal strings always
/// share one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Create an identity from any string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The sentinel bucket for requests with no usable origin information.
    pub fn unknown() -> Self {
        Self(String::new())
    }

    /// Whether this is the sentinel bucket.
    pub fn is_unknown(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality() {
        let a = Identity::from("192.168.1.1");
        let b = Identity::new(String::from("192.168.1.1"));
        let c = Identity::from("192.168.1.2");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_unknown_identity() {
        let unknown = Identity::unknown();

        assert!(unknown.is_unknown());
        assert_eq!(unknown, Identity::default());
        assert_eq!(unknown.to_string(), "<unknown>");
    }

    #[test]
    fn test_arbitrary_strings_are_accepted() {
        let identity = Identity::from("not-an-ip");

        assert!(!identity.is_unknown());
        assert_eq!(identity.as_str(), "not-an-ip");
        assert_eq!(identity.to_string(), "not-an-ip");
    }
}
