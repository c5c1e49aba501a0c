use crate::ast::{Journal, Position, SourceLocation};
use crate::error::{Error, Result};
use pest::error::LineColLocation;
use pest::Parser;
use tracing::debug;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod declarations;
mod values;

use declarations::Lowering;

#[derive(Parser)]
#[grammar = "journal.pest"]
pub struct LedgerParser;

/// Anything able to turn a file into a [`Journal`]. Resolution runs parses
/// from several tasks at once, hence the bounds.
pub trait JournalParser: Send + Sync {
    fn parse_journal(&self, path: &Path) -> Result<Journal>;
}

impl JournalParser for LedgerParser {
    fn parse_journal(&self, path: &Path) -> Result<Journal> {
        let input = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = input.len(), "parsing journal");
        parse_str(&input, Some(path))
    }
}

/// Parses journal text. `file` only ends up in source locations; reading
/// files is left to [`JournalParser::parse_journal`].
pub fn parse_str(input: &str, file: Option<&Path>) -> Result<Journal> {
    let terminated;
    let input = if input.is_empty() || input.ends_with('\n') {
        input
    } else {
        terminated = format!("{}\n", input);
        terminated.as_str()
    };

    let file = file.map(|path| Arc::new(path.to_path_buf()));
    let root = LedgerParser::parse(Rule::journal, input)
        .map_err(|err| syntax_error(err, file.as_ref()))?
        .next()
        .ok_or_else(|| Error::InvalidState("parser produced no journal".into()))?;

    let lowering = Lowering::new(file);
    let location = lowering.location(&root);

    let mut declarations = vec![];
    for pair in root.into_inner() {
        if pair.as_rule() == Rule::EOI {
            continue;
        }
        let location = lowering.location(&pair);
        let preview = pair.as_str().lines().next().unwrap_or_default().to_string();
        let declaration = lowering.declaration(pair).map_err(|err| Error::Syntax {
            location,
            message: format!("{:#}", err),
            preview,
        })?;
        declarations.push(declaration);
    }

    Journal::builder()
        .location(location)
        .declarations(declarations)
        .build()
}

fn syntax_error(err: pest::error::Error<Rule>, file: Option<&Arc<PathBuf>>) -> Error {
    let (start, end) = match err.line_col {
        LineColLocation::Pos((line, col)) => (Position::new(line, col), Position::new(line, col)),
        LineColLocation::Span((l1, c1), (l2, c2)) => (Position::new(l1, c1), Position::new(l2, c2)),
    };
    Error::Syntax {
        location: SourceLocation::new(file.cloned(), start, end),
        message: err.variant.message().into_owned(),
        preview: err.line().to_string(),
    }
}
