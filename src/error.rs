use std::{fmt, path::PathBuf};

use thiserror::Error;

use crate::record::Shape;

/// Errors produced while extracting, classifying or managing citation records.
#[derive(Error, Debug)]
pub enum Error {
    /// The page carries no `citation_*` meta tags at all.
    #[error("no Highwire Press metadata found")]
    NoMetadataFound,

    #[error("unable to parse a year from date `{0}`")]
    DateParseError(String),

    #[error("author name `{0}` needs at least a first and a last name")]
    MalformedAuthorName(String),

    /// None of the citation shapes had all of its required fields.
    #[error("insufficient metadata to classify `{name}`: {}", FailureList(.failures))]
    InsufficientMetadata {
        name: String,
        failures: Vec<AttemptFailure>,
    },

    #[error("invalid tag input: {0}")]
    InvalidTagInput(String),

    #[error("unable to remove tag `{0}`: not present")]
    TagNotFound(String),

    #[error("invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("export failed: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single classification attempt gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub shape: Shape,
    pub problem: FieldProblem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProblem {
    /// Required tag is absent from the mapping.
    Missing(&'static str),
    /// Tag is present but holds a list where a single value is expected.
    NotScalar(&'static str),
    /// Tag is present but its value could not be processed.
    Invalid { field: &'static str, reason: String },
    /// The mapping has no entries at all.
    Empty,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.shape, self.problem)
    }
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldProblem::Missing(field) => write!(f, "missing `{field}`"),
            FieldProblem::NotScalar(field) => write!(f, "`{field}` holds several values"),
            FieldProblem::Invalid { field, reason } => write!(f, "`{field}` is invalid ({reason})"),
            FieldProblem::Empty => f.write_str("no tags"),
        }
    }
}

struct FailureList<'a>(&'a [AttemptFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no shape attempted");
        }
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}
