#![forbid(unsafe_code)]

//! Default rejection type for [`Promise`](crate::Promise).
//!
//! A promise may be rejected with any `E`; `Error` is what you get when the
//! error parameter is left at its default. It is cheap to clone so the same
//! rejection can be delivered to every error and always handler in a chain.

use std::fmt;
use std::sync::Arc;

/// Application-supplied failure carried by a rejected promise.
#[derive(Clone)]
pub enum Error {
    /// A plain failure message.
    Message(String),
    /// A failure wrapping an arbitrary error source.
    Source(Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Build a message error.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wrap an error source.
    #[must_use]
    pub fn wrap(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Source(Arc::new(err))
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(msg) => f.debug_tuple("Message").field(msg).finish(),
            Self::Source(err) => f.debug_tuple("Source").field(&err.to_string()).finish(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(msg) => write!(f, "{msg}"),
            Self::Source(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Message(_) => None,
            Self::Source(err) => Some(err.as_ref()),
        }
    }
}

// Sources compare by identity: two rejections are equal only if they carry
// the very same error object.
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Message(a), Self::Message(b)) => a == b,
            (Self::Source(a), Self::Source(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::Message(message.to_owned())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::wrap(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn message_display() {
        assert_eq!(Error::msg("boom").to_string(), "boom");
        assert!(Error::msg("boom").source().is_none());
    }

    #[test]
    fn source_display_and_chain() {
        let err = Error::from(std::io::Error::other("disk gone"));
        assert_eq!(err.to_string(), "disk gone");
        assert!(err.source().is_some());
    }

    #[test]
    fn messages_compare_by_value() {
        assert_eq!(Error::msg("a"), Error::from("a"));
        assert_ne!(Error::msg("a"), Error::msg("b"));
    }

    #[test]
    fn sources_compare_by_identity() {
        let a = Error::wrap(std::io::Error::other("x"));
        let b = Error::wrap(std::io::Error::other("x"));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a, Error::msg("x"));
    }

    #[test]
    fn debug_mentions_variant() {
        let dbg = format!("{:?}", Error::msg("nope"));
        assert!(dbg.contains("Message"));
        assert!(dbg.contains("nope"));
    }
}
