use crate::ast::{NodeKind, SourceLocation};
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while building, rewriting, resolving or
/// printing a journal.
#[derive(Debug, Error)]
pub enum Error {
    #[error("syntax error at {location}: {message}\n  | {preview}")]
    Syntax {
        location: SourceLocation,
        message: String,
        preview: String,
    },

    #[error("cannot read `{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot build {node}: mandatory field `{field}' is missing")]
    MissingField {
        node: &'static str,
        field: &'static str,
    },

    #[error("cannot pass non-empty children to {node}, it doesn't hold children")]
    UnexpectedChildren { node: &'static str },

    #[error("{parent}.{field} holds {expected} nodes, got {found}")]
    IncompatibleChild {
        parent: &'static str,
        field: &'static str,
        expected: NodeKind,
        found: NodeKind,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    #[error("cannot write the printed journal: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("traversal aborted at {location}")]
    TraversalAborted { location: SourceLocation },

    #[error("include `{filename}' was already substituted in this journal")]
    IncludeRepeated { filename: String },

    #[error("include cycle: {}", display_chain(chain))]
    IncludeCycle { chain: Vec<PathBuf> },

    #[error("cannot sort {kind} at {location}, only transactions and insert-entry markers")]
    Unsortable {
        location: SourceLocation,
        kind: &'static str,
    },

    #[error("resolution task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
