//! Conditional-write policy.
//!
//! Every mutating request may carry a precondition on the version the
//! server currently holds for the key. The policy is a closed set so that a
//! caller cannot, for example, ask for "create-only" and "match this ref"
//! at the same time.

use crate::{Error, Result};

/// Header carrying a required current version.
pub const IF_MATCH: &str = "If-Match";

/// Header carrying a required absence of any version.
pub const IF_NONE_MATCH: &str = "If-None-Match";

/// Precondition attached to a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Conditional {
    /// No precondition.
    #[default]
    Unconditional,
    /// Succeed only if the server still holds the ref this object last saw.
    MatchCurrent,
    /// Succeed only if the server holds exactly this ref.
    MatchRef(String),
    /// Succeed only if nothing exists at the key yet.
    NoneMatch,
}

impl Conditional {
    /// Builds a `MatchRef` policy, stripping any quotes copied from an ETag.
    pub fn match_ref(ref_: impl AsRef<str>) -> Self {
        Conditional::MatchRef(ref_.as_ref().trim_matches('"').to_string())
    }

    /// Returns true if this policy emits no header.
    #[must_use]
    pub fn is_unconditional(&self) -> bool {
        matches!(self, Conditional::Unconditional)
    }

    /// Renders the policy into a header name/value pair.
    ///
    /// `current_ref` is the ref the writing object last observed; it is only
    /// consulted for [`Conditional::MatchCurrent`], which fails with
    /// [`Error::MissingRef`] when no ref is known.
    pub fn header(&self, current_ref: Option<&str>) -> Result<Option<(&'static str, String)>> {
        match self {
            Conditional::Unconditional => Ok(None),
            Conditional::MatchCurrent => {
                let current = current_ref.filter(|r| !r.is_empty()).ok_or(Error::MissingRef)?;
                Ok(Some((IF_MATCH, quote(current))))
            }
            Conditional::MatchRef(r) => Ok(Some((IF_MATCH, quote(r)))),
            Conditional::NoneMatch => Ok(Some((IF_NONE_MATCH, "\"*\"".to_string()))),
        }
    }
}

impl From<&str> for Conditional {
    fn from(ref_: &str) -> Self {
        Conditional::match_ref(ref_)
    }
}

fn quote(ref_: &str) -> String {
    format!("\"{}\"", ref_.trim_matches('"'))
}
