use std::borrow::Cow;

use crate::dialect::Dialect;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("template has {chunks} literal chunks for {params} parameters, expected exactly one more chunk than parameters")]
    ChunkCount { chunks: usize, params: usize },

    #[error("inappropriately quoted/enclosed parameter #{index}: opened with `{open}` but followed by {close:?}")]
    Enclosure {
        index: usize,
        open: char,
        close: Option<char>,
    },

    #[error("unsafe SQL fragment {fragment:?}: {reason}")]
    Unsafe {
        fragment: String,
        reason: Cow<'static, str>,
    },

    #[error("{context} parameter requires {expected}, got {found}")]
    NotIterable {
        context: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("row-set parameter has 0 rows")]
    EmptyRows,

    #[error("row #{row} has column {column:?} which is not present in the first row")]
    RowShape { row: usize, column: String },

    #[error("key/value set parameter is empty")]
    EmptySet,

    #[error("list nesting depth {depth} is not supported by {dialect}")]
    ListDepth { depth: usize, dialect: Dialect },

    #[error("{0} is outside the signed 64-bit integer range")]
    Range(String),

    #[error("cannot stringify value of type {0}")]
    Stringify(&'static str),

    #[error("{0}")]
    Usage(Cow<'static, str>),

    #[error("{feature} is not supported by {dialect}; {hatch}")]
    Unsupported {
        feature: Cow<'static, str>,
        dialect: Dialect,
        hatch: Cow<'static, str>,
    },

    #[error("alias {0:?} is reserved")]
    ReservedAlias(String),

    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rendered SQL is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    pub(crate) fn unsafe_fragment(fragment: &[u8], reason: impl Into<Cow<'static, str>>) -> Self {
        let reason = reason.into();
        tracing::trace!(%reason, "rejected sql fragment");
        Self::Unsafe {
            fragment: String::from_utf8_lossy(fragment).into_owned(),
            reason,
        }
    }

    pub(crate) fn usage(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Usage(message.into())
    }

    pub(crate) fn unsupported(
        feature: impl Into<Cow<'static, str>>,
        dialect: Dialect,
        hatch: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Unsupported {
            feature: feature.into(),
            dialect,
            hatch: hatch.into(),
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    pub fn is_unsafe(&self) -> bool {
        matches!(self, Self::Unsafe { .. })
    }
}
