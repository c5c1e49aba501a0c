//! Substitutes resolved include pragmas with the declarations of the files
//! they point to.

use crate::ast::{IncludePragma, Journal, Node};
use crate::error::{Error, Result};
use crate::transformer::transform_journal;
use crate::visitor::{Control, NodeVisitor, TraverserContext};
use std::collections::HashSet;
use tracing::{debug, warn};

struct Flattener {
    recurse: bool,
    keep_include_pragmas: bool,
    substituted: HashSet<String>,
    repeated: Option<String>,
}

impl Flattener {
    fn new(recurse: bool, keep_include_pragmas: bool) -> Self {
        Flattener {
            recurse,
            keep_include_pragmas,
            substituted: HashSet::new(),
            repeated: None,
        }
    }
}

impl NodeVisitor for Flattener {
    fn visit_include(
        &mut self,
        pragma: &IncludePragma,
        _context: &TraverserContext<'_>,
    ) -> Control {
        let Some(nested) = pragma.journal() else {
            return Control::Continue;
        };
        let filename = pragma.filename();

        if self.substituted.contains(filename) {
            if !self.keep_include_pragmas || !self.recurse {
                self.repeated = Some(filename.to_string());
                return Control::Quit;
            }
            warn!(
                filename,
                location = %pragma.location(),
                "include already substituted, keeping the pragma only"
            );
            return Control::Continue;
        }
        self.substituted.insert(filename.to_string());

        debug!(filename, declarations = nested.len(), "splicing include");
        // Spliced content is visited next, so nested includes expand in turn.
        let nodes = nested
            .declarations()
            .iter()
            .cloned()
            .map(Node::Declaration)
            .collect();

        if self.keep_include_pragmas {
            Control::InsertAfter(nodes)
        } else {
            Control::Splice(nodes)
        }
    }
}

/// Replaces every resolved include pragma of `journal`, at any depth, with
/// the nested declarations in their original order. With
/// `keep_include_pragmas` the pragma stays in front of its content.
///
/// Meeting the same filename twice fails with [`Error::IncludeRepeated`],
/// unless both `recurse` and `keep_include_pragmas` are set: the second
/// pragma is then kept as a marker and its content is not repeated.
pub fn flatten(journal: Journal, recurse: bool, keep_include_pragmas: bool) -> Result<Journal> {
    let mut flattener = Flattener::new(recurse, keep_include_pragmas);
    match transform_journal(journal, &mut flattener) {
        Err(Error::TraversalAborted { .. }) if flattener.repeated.is_some() => {
            Err(Error::IncludeRepeated {
                filename: flattener.repeated.unwrap_or_default(),
            })
        }
        other => other,
    }
}

/// Flattens each journal on its own and concatenates the results.
pub fn merge(
    journals: Vec<Journal>,
    recurse: bool,
    keep_include_pragmas: bool,
) -> Result<Journal> {
    if journals.is_empty() {
        return Err(Error::InvalidState(
            "at least one journal is needed to merge".into(),
        ));
    }

    let mut declarations = vec![];
    for journal in journals {
        let flat = flatten(journal, recurse, keep_include_pragmas)?;
        declarations.extend(flat.into_declarations());
    }
    Ok(Journal::new(declarations))
}
