//! Date ordering of transaction-only journals.

use crate::ast::{
    CustomDirective, Directive, Journal, JournalDeclaration, MetadataValue, ScalarValue,
};
use crate::error::{Error, Result};
use tracing::debug;

/// `custom "fava-option" "insert-entry" <pattern>`, the marker Fava uses to
/// place new entries.
fn is_insert_entry(custom: &CustomDirective) -> bool {
    let values = custom.values();
    custom.name() == "fava-option"
        && values.len() == 2
        && matches!(
            values.first(),
            Some(MetadataValue::Scalar(ScalarValue::String(s))) if s == "insert-entry"
        )
}

/// Reorders transactions (and insert-entry markers) by ascending date,
/// keeping the original order between equal dates. Blank lines are dropped;
/// any other declaration is refused before anything is reordered.
pub fn sort(journal: Journal) -> Result<Journal> {
    let mut entries = Vec::with_capacity(journal.len());

    for declaration in journal.declarations() {
        match declaration {
            JournalDeclaration::Eol(_) => continue,
            JournalDeclaration::Directive(directive @ Directive::Transaction(_)) => {
                entries.push(directive.clone())
            }
            JournalDeclaration::Directive(directive @ Directive::Custom(custom))
                if is_insert_entry(custom) =>
            {
                entries.push(directive.clone())
            }
            other => {
                return Err(Error::Unsortable {
                    location: other.location().clone(),
                    kind: other.type_name(),
                })
            }
        }
    }

    entries.sort_by_key(|directive| *directive.date());
    debug!(entries = entries.len(), "sorted journal");

    Ok(journal.transform(|draft| {
        draft.declarations = entries.into_iter().map(JournalDeclaration::from).collect()
    }))
}
