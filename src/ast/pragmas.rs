use super::journal::Journal;
use super::location::SourceLocation;
use super::{AstNode, NamedChildren};
use crate::error::Result;
use std::sync::Arc;

ast_node! {
    /// `include "file"`. The nested journal is attached by resolution; it is
    /// an edge of the document graph, not a traversable child.
    pub struct IncludePragma {
        text { filename }
        optional { journal: Arc<Journal> }
        optional_text { comment }
    }
}

ast_node! {
    pub struct OptionPragma {
        text { name, value }
        optional_text { comment }
    }
}

ast_node! {
    pub struct PluginPragma {
        text { name }
        optional_text { config, comment }
    }
}

ast_node! {
    pub struct PushtagPragma {
        text { tag }
        optional_text { comment }
    }
}

ast_node! {
    pub struct PoptagPragma {
        text { tag }
        optional_text { comment }
    }
}

leaf_node!(IncludePragma, OptionPragma, PluginPragma, PushtagPragma, PoptagPragma);

impl IncludePragma {
    pub fn is_resolved(&self) -> bool {
        self.journal.is_some()
    }
}

/// Undated control entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Pragma {
    Include(IncludePragma),
    Option(OptionPragma),
    Plugin(PluginPragma),
    Pushtag(PushtagPragma),
    Poptag(PoptagPragma),
}

impl Pragma {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Pragma::Include(p) => p.location(),
            Pragma::Option(p) => p.location(),
            Pragma::Plugin(p) => p.location(),
            Pragma::Pushtag(p) => p.location(),
            Pragma::Poptag(p) => p.location(),
        }
    }

    pub fn comment(&self) -> Option<&str> {
        match self {
            Pragma::Include(p) => p.comment(),
            Pragma::Option(p) => p.comment(),
            Pragma::Plugin(p) => p.comment(),
            Pragma::Pushtag(p) => p.comment(),
            Pragma::Poptag(p) => p.comment(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Pragma::Include(_) => "IncludePragma",
            Pragma::Option(_) => "OptionPragma",
            Pragma::Plugin(_) => "PluginPragma",
            Pragma::Pushtag(_) => "PushtagPragma",
            Pragma::Poptag(_) => "PoptagPragma",
        }
    }
}

impl AstNode for Pragma {
    fn named_children(&self) -> NamedChildren {
        NamedChildren::new()
    }

    fn with_new_children(&self, children: NamedChildren) -> Result<Self> {
        Ok(match self {
            Pragma::Include(p) => Pragma::Include(p.with_new_children(children)?),
            Pragma::Option(p) => Pragma::Option(p.with_new_children(children)?),
            Pragma::Plugin(p) => Pragma::Plugin(p.with_new_children(children)?),
            Pragma::Pushtag(p) => Pragma::Pushtag(p.with_new_children(children)?),
            Pragma::Poptag(p) => Pragma::Poptag(p.with_new_children(children)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn attaching_journal_keeps_filename() -> Result<()> {
        let include = IncludePragma::builder().filename("accounts.bean").build()?;
        assert!(!include.is_resolved());

        let resolved =
            include.transform(|draft| draft.journal = Some(Arc::new(Journal::new(vec![]))));
        assert!(resolved.is_resolved());
        assert!(!include.is_resolved());
        assert_eq!(resolved.filename(), "accounts.bean");
        Ok(())
    }
}
