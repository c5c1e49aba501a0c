use super::directives::Directive;
use super::location::SourceLocation;
use super::node::{Node, NodeKind};
use super::pragmas::{IncludePragma, Pragma};
use super::{AstNode, NamedChildren};
use crate::error::{Error, Result};
use chrono::NaiveDate;

ast_node! {
    /// `;` comment, either free-standing or inside a metadata block.
    /// `text` holds everything after the semicolon.
    pub struct Comment {
        text { text }
    }
}

ast_node! {
    /// Blank line. Kept so the printer can reproduce vertical spacing.
    pub struct Eol {}
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            location: SourceLocation::empty(),
            text: text.into(),
        }
    }
}

impl Eol {
    pub fn new() -> Self {
        Self {
            location: SourceLocation::empty(),
        }
    }
}

impl Default for Eol {
    fn default() -> Self {
        Self::new()
    }
}

leaf_node!(Comment, Eol);

/// Top level entry of a journal.
#[derive(Clone, Debug, PartialEq)]
pub enum JournalDeclaration {
    Directive(Directive),
    Pragma(Pragma),
    Comment(Comment),
    Eol(Eol),
}

impl JournalDeclaration {
    pub fn location(&self) -> &SourceLocation {
        match self {
            JournalDeclaration::Directive(d) => d.location(),
            JournalDeclaration::Pragma(p) => p.location(),
            JournalDeclaration::Comment(c) => c.location(),
            JournalDeclaration::Eol(e) => e.location(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            JournalDeclaration::Directive(d) => d.type_name(),
            JournalDeclaration::Pragma(p) => p.type_name(),
            JournalDeclaration::Comment(_) => "Comment",
            JournalDeclaration::Eol(_) => "Eol",
        }
    }

    pub fn as_directive(&self) -> Option<&Directive> {
        match self {
            JournalDeclaration::Directive(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_include(&self) -> Option<&IncludePragma> {
        match self {
            JournalDeclaration::Pragma(Pragma::Include(include)) => Some(include),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.as_directive().map(|d| *d.date())
    }

    pub fn is_eol(&self) -> bool {
        matches!(self, JournalDeclaration::Eol(_))
    }
}

impl AstNode for JournalDeclaration {
    fn named_children(&self) -> NamedChildren {
        match self {
            JournalDeclaration::Directive(d) => d.named_children(),
            JournalDeclaration::Pragma(p) => p.named_children(),
            JournalDeclaration::Comment(c) => c.named_children(),
            JournalDeclaration::Eol(e) => e.named_children(),
        }
    }

    fn with_new_children(&self, children: NamedChildren) -> Result<Self> {
        Ok(match self {
            JournalDeclaration::Directive(d) => {
                JournalDeclaration::Directive(d.with_new_children(children)?)
            }
            JournalDeclaration::Pragma(p) => {
                JournalDeclaration::Pragma(p.with_new_children(children)?)
            }
            JournalDeclaration::Comment(c) => {
                JournalDeclaration::Comment(c.with_new_children(children)?)
            }
            JournalDeclaration::Eol(e) => JournalDeclaration::Eol(e.with_new_children(children)?),
        })
    }
}

impl From<Directive> for JournalDeclaration {
    fn from(directive: Directive) -> Self {
        JournalDeclaration::Directive(directive)
    }
}

impl From<Pragma> for JournalDeclaration {
    fn from(pragma: Pragma) -> Self {
        JournalDeclaration::Pragma(pragma)
    }
}

impl From<Comment> for JournalDeclaration {
    fn from(comment: Comment) -> Self {
        JournalDeclaration::Comment(comment)
    }
}

impl From<Eol> for JournalDeclaration {
    fn from(eol: Eol) -> Self {
        JournalDeclaration::Eol(eol)
    }
}

ast_node! {
    /// Root of a single file: its declarations in line order.
    pub struct Journal {
        defaulted { declarations: Vec<JournalDeclaration> }
    }
}

impl Journal {
    pub fn new(declarations: Vec<JournalDeclaration>) -> Self {
        Self {
            location: SourceLocation::empty(),
            declarations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn directives(&self) -> impl Iterator<Item = &Directive> {
        self.declarations.iter().filter_map(JournalDeclaration::as_directive)
    }

    pub fn include_pragmas(&self) -> impl Iterator<Item = &IncludePragma> {
        self.declarations.iter().filter_map(JournalDeclaration::as_include)
    }

    pub fn into_declarations(self) -> Vec<JournalDeclaration> {
        self.declarations
    }
}

pub(crate) const DECLARATIONS: &str = "declarations";

impl AstNode for Journal {
    fn named_children(&self) -> NamedChildren {
        let mut children = NamedChildren::new();
        children.insert(
            DECLARATIONS,
            self.declarations
                .iter()
                .cloned()
                .map(Node::Declaration)
                .collect(),
        );
        children
    }

    fn with_new_children(&self, mut children: NamedChildren) -> Result<Self> {
        let nodes = children.shift_remove(DECLARATIONS).unwrap_or_default();
        if let Some(field) = children.keys().next() {
            return Err(Error::InvalidState(format!(
                "Journal has no child field `{}'",
                field
            )));
        }

        let declarations = nodes
            .into_iter()
            .map(|node| match node {
                Node::Declaration(declaration) => Ok(declaration),
                other => Err(Error::IncompatibleChild {
                    parent: "Journal",
                    field: DECLARATIONS,
                    expected: NodeKind::Declaration,
                    found: other.kind(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(self.transform(|draft| draft.declarations = declarations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Account, BalanceDirective, OptionPragma, Posting};
    use anyhow::Result;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn transform_leaves_original_untouched() -> Result<()> {
        let journal = Journal::new(vec![Comment::new(" hello").into(), Eol::new().into()]);
        let changed = journal.transform(|draft| {
            draft.declarations.remove(0);
        });

        assert_eq!(journal.len(), 2);
        assert_eq!(changed.len(), 1);
        assert!(changed.declarations()[0].is_eol());
        Ok(())
    }

    #[test]
    fn builder_requires_mandatory_fields() {
        let err = BalanceDirective::builder().date(date(2021, 2, 28)).build();
        assert!(matches!(
            err,
            Err(Error::MissingField {
                node: "BalanceDirective",
                field: "account"
            })
        ));
    }

    #[test]
    fn rejects_foreign_children() -> Result<()> {
        let journal = Journal::new(vec![]);
        let posting = Posting::builder().account(Account::from("Assets:Cash")).build()?;

        let mut children = NamedChildren::new();
        children.insert(DECLARATIONS, vec![Node::Posting(posting)]);
        assert!(matches!(
            journal.with_new_children(children),
            Err(Error::IncompatibleChild {
                expected: NodeKind::Declaration,
                found: NodeKind::Posting,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn named_children_follow_declaration_order() -> Result<()> {
        let option = OptionPragma::builder()
            .name("title")
            .value("Jawir")
            .build()?;
        let journal = Journal::new(vec![
            Pragma::Option(option.clone()).into(),
            Comment::new("x").into(),
        ]);

        let children = journal.named_children();
        let declarations = &children[DECLARATIONS];
        assert_eq!(declarations.len(), 2);
        assert_eq!(
            declarations[0],
            Node::Declaration(Pragma::Option(option).into())
        );
        assert_eq!(journal.with_new_children(children)?, journal);
        Ok(())
    }

    #[test]
    fn leaf_refuses_children() {
        let mut children = NamedChildren::new();
        children.insert("nothing", vec![Node::Declaration(Eol::new().into())]);
        assert!(matches!(
            Eol::new().with_new_children(children),
            Err(Error::UnexpectedChildren { node: "Eol" })
        ));
        assert_eq!(
            Eol::new().with_new_children(NamedChildren::new()).ok(),
            Some(Eol::new())
        );
    }
}
