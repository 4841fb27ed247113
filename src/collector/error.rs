//! Error taxonomy shared by all readers.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Why a reader could not produce its metric for a tick.
///
/// None of these are fatal to the sampling loop; the sampler logs them and
/// moves on to the next reader.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The counter file or command could not be opened or executed.
    #[error("{source_name} unavailable: {error}")]
    SourceUnavailable {
        source_name: String,
        #[source]
        error: io::Error,
    },

    /// The external command did not finish within its deadline.
    #[error("{command} did not finish within {after:?}")]
    Timeout { command: String, after: Duration },

    /// A field that must be numeric was not.
    #[error("parse error: {0}")]
    Parse(String),

    /// The source produced none of the expected fields.
    #[error("no match: {0}")]
    NoMatch(String),
}

impl CollectError {
    pub fn unavailable(source_name: impl Into<String>, error: io::Error) -> Self {
        CollectError::SourceUnavailable {
            source_name: source_name.into(),
            error,
        }
    }

    /// Expired commands count as an unavailable source.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            CollectError::SourceUnavailable { .. } | CollectError::Timeout { .. }
        )
    }
}

impl From<crate::collector::procfs::parser::ParseError> for CollectError {
    fn from(e: crate::collector::procfs::parser::ParseError) -> Self {
        CollectError::Parse(e.message)
    }
}
