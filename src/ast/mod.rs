//! Immutable syntax tree of a beancount journal.
//!
//! Nodes are built through builders and never mutated afterwards: every edit
//! goes through `transform`, which hands a draft of the node's fields to a
//! closure and builds a brand-new node out of it.

#[macro_use]
mod macros;

mod directives;
mod journal;
mod location;
mod metadata;
mod node;
mod pragmas;
mod values;

pub use directives::*;
pub use journal::*;
pub use location::{Position, SourceLocation};
pub use metadata::{Metadata, MetadataItem, MetadataLine};
pub use node::{Node, NodeKind};
pub use pragmas::*;
pub use values::*;

use crate::error::Result;
use indexmap::IndexMap;

/// Child subtrees keyed by a stable field name, in the node's own order.
pub type NamedChildren = IndexMap<&'static str, Vec<Node>>;

/// Generic access to a node's children, used by the rewrite engine.
pub trait AstNode: Sized {
    fn named_children(&self) -> NamedChildren;

    /// Rebuilds the node around a replacement children map. A field missing
    /// from `children` is taken as an empty list.
    fn with_new_children(&self, children: NamedChildren) -> Result<Self>;
}
