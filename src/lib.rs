//! Beancount journals as immutable trees.
//!
//! A journal is parsed into an [`ast::Journal`], its `include` pragmas are
//! resolved concurrently by a [`Resolver`], and the tree is rewritten with
//! visitors driven by [`transform`]: [`flatten`] substitutes includes with
//! their content and [`sort`] orders transactions by date. [`Printer`] turns
//! any journal back into canonical text.

extern crate pest;
#[macro_use]
extern crate pest_derive;

pub mod ast;
pub mod error;
pub mod flatten;
pub mod parser;
pub mod printer;
pub mod resolve;
pub mod sort;
pub mod transformer;
pub mod visitor;

pub use error::{Error, Result};
pub use flatten::{flatten, merge};
pub use parser::{parse_str, JournalParser, LedgerParser};
pub use printer::{print, Printer, PrinterConfig};
pub use resolve::{ExecutionStrategy, Resolver};
pub use sort::sort;
pub use transformer::{transform, transform_journal};
pub use visitor::{Control, NodeVisitor, TraverserContext};
