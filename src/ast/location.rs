use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A 1-based line/column pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Where a node came from. Nodes built in code carry the empty location.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    file: Option<Arc<PathBuf>>,
    start: Position,
    end: Position,
}

impl SourceLocation {
    pub fn new(file: Option<Arc<PathBuf>>, start: Position, end: Position) -> Self {
        Self { file, start, end }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref().map(PathBuf::as_path)
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.file.is_none() && self.start == Position::default()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.file() {
            Some(file) => write!(
                f,
                "{}:{}:{}",
                file.display(),
                self.start.line,
                self.start.column
            ),
            None => write!(f, "<input>:{}:{}", self.start.line, self.start.column),
        }
    }
}
