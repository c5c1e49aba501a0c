use super::directives::{Directive, Posting, POSTINGS};
use super::journal::{Journal, JournalDeclaration, DECLARATIONS};
use super::location::SourceLocation;
use super::{AstNode, NamedChildren};
use crate::error::Result;
use std::fmt;

/// Any node the rewrite engine can hold.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Journal(Journal),
    Declaration(JournalDeclaration),
    Posting(Posting),
}

/// Shape of a node as far as child lists are concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Journal,
    Declaration,
    Posting,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Journal => f.write_str("journal"),
            NodeKind::Declaration => f.write_str("declaration"),
            NodeKind::Posting => f.write_str("posting"),
        }
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Journal(_) => NodeKind::Journal,
            Node::Declaration(_) => NodeKind::Declaration,
            Node::Posting(_) => NodeKind::Posting,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            Node::Journal(j) => j.location(),
            Node::Declaration(d) => d.location(),
            Node::Posting(p) => p.location(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Journal(_) => "Journal",
            Node::Declaration(d) => d.type_name(),
            Node::Posting(_) => "Posting",
        }
    }

    /// Kind of node stored under `field`, if this node has such a field.
    pub fn child_kind(&self, field: &str) -> Option<NodeKind> {
        match (self, field) {
            (Node::Journal(_), DECLARATIONS) => Some(NodeKind::Declaration),
            (
                Node::Declaration(JournalDeclaration::Directive(Directive::Transaction(_))),
                POSTINGS,
            ) => Some(NodeKind::Posting),
            _ => None,
        }
    }

    pub fn into_journal(self) -> Option<Journal> {
        match self {
            Node::Journal(journal) => Some(journal),
            _ => None,
        }
    }
}

impl AstNode for Node {
    fn named_children(&self) -> NamedChildren {
        match self {
            Node::Journal(j) => j.named_children(),
            Node::Declaration(d) => d.named_children(),
            Node::Posting(p) => p.named_children(),
        }
    }

    fn with_new_children(&self, children: NamedChildren) -> Result<Self> {
        Ok(match self {
            Node::Journal(j) => Node::Journal(j.with_new_children(children)?),
            Node::Declaration(d) => Node::Declaration(d.with_new_children(children)?),
            Node::Posting(p) => Node::Posting(p.with_new_children(children)?),
        })
    }
}

impl From<Journal> for Node {
    fn from(journal: Journal) -> Self {
        Node::Journal(journal)
    }
}

impl From<JournalDeclaration> for Node {
    fn from(declaration: JournalDeclaration) -> Self {
        Node::Declaration(declaration)
    }
}

impl From<Posting> for Node {
    fn from(posting: Posting) -> Self {
        Node::Posting(posting)
    }
}
