//! Depth-first rewrite engine.
//!
//! The walk keeps an explicit stack of frames, one per ancestor of the node
//! being visited. A frame holds the children still to visit and the children
//! already settled; when its last child is settled the frame is popped and
//! its node rebuilt, or handed back as is when nothing below it changed.

use crate::ast::{AstNode, Journal, NamedChildren, Node};
use crate::error::{Error, Result};
use crate::visitor::{accept, Control, NodeVisitor, TraverserContext};
use std::collections::VecDeque;
use tracing::trace;

struct Frame {
    node: Node,
    pending: Vec<(&'static str, VecDeque<Node>)>,
    field: usize,
    settled: NamedChildren,
    changed: bool,
}

impl Frame {
    fn new(node: Node) -> Self {
        let pending: Vec<_> = node
            .named_children()
            .into_iter()
            .map(|(field, children)| (field, VecDeque::from(children)))
            .collect();
        let settled = pending
            .iter()
            .map(|(field, _)| (*field, Vec::new()))
            .collect();

        Frame {
            node,
            pending,
            field: 0,
            settled,
            changed: false,
        }
    }

    fn next_child(&mut self) -> Option<(&'static str, usize, Node)> {
        while let Some((field, queue)) = self.pending.get_mut(self.field) {
            if let Some(child) = queue.pop_front() {
                let index = self.settled.get(*field).map_or(0, Vec::len);
                return Some((*field, index, child));
            }
            self.field += 1;
        }
        None
    }

    fn settle(&mut self, child: Node) {
        if let Some((field, _)) = self.pending.get(self.field) {
            self.settled.entry(*field).or_default().push(child);
        }
    }

    fn queue_next(&mut self, nodes: Vec<Node>) {
        if let Some((_, queue)) = self.pending.get_mut(self.field) {
            for node in nodes.into_iter().rev() {
                queue.push_front(node);
            }
        }
    }

    fn check_shape(&self, field: &'static str, child: &Node) -> Result<()> {
        match self.node.child_kind(field) {
            Some(expected) if expected == child.kind() => Ok(()),
            Some(expected) => Err(Error::IncompatibleChild {
                parent: self.node.type_name(),
                field,
                expected,
                found: child.kind(),
            }),
            None => Err(Error::InvalidState(format!(
                "{} has no child field `{}'",
                self.node.type_name(),
                field
            ))),
        }
    }

    fn finish(self) -> Result<(Node, bool)> {
        if self.changed {
            Ok((self.node.with_new_children(self.settled)?, true))
        } else {
            Ok((self.node, false))
        }
    }
}

/// Walks `root` pre-order, applying the edits requested by `visitor`, and
/// returns the rewritten tree. `root` itself is never modified; subtrees no
/// edit reached are returned as they were.
pub fn transform<V: NodeVisitor + ?Sized>(root: Node, visitor: &mut V) -> Result<Node> {
    let root = match accept(visitor, &root, &TraverserContext::root()) {
        Control::Continue => root,
        Control::Replace(replacement) => {
            trace!(from = root.type_name(), to = replacement.type_name(), "replace root");
            replacement
        }
        Control::Quit => {
            return Err(Error::TraversalAborted {
                location: root.location().clone(),
            })
        }
        Control::Delete | Control::InsertAfter(_) | Control::Splice(_) => {
            return Err(Error::InvalidState(
                "the root node has no siblings to edit".into(),
            ))
        }
    };

    let mut stack = vec![Frame::new(root)];

    while let Some(top) = stack.len().checked_sub(1) {
        let Some((field, index, child)) = stack[top].next_child() else {
            let Some(frame) = stack.pop() else { break };
            let (node, changed) = frame.finish()?;
            match stack.last_mut() {
                Some(parent) => {
                    parent.settle(node);
                    parent.changed |= changed;
                }
                None => return Ok(node),
            }
            continue;
        };

        let control = {
            let context = TraverserContext {
                parent: Some(&stack[top].node),
                field: Some(field),
                index,
                depth: stack.len(),
            };
            accept(visitor, &child, &context)
        };

        let frame = &mut stack[top];
        match control {
            Control::Continue => stack.push(Frame::new(child)),
            Control::Replace(replacement) => {
                frame.check_shape(field, &replacement)?;
                trace!(
                    field,
                    index,
                    from = child.type_name(),
                    to = replacement.type_name(),
                    "replace"
                );
                frame.changed = true;
                stack.push(Frame::new(replacement));
            }
            Control::Delete => {
                trace!(field, index, node = child.type_name(), "delete");
                frame.changed = true;
            }
            Control::InsertAfter(nodes) => {
                for node in &nodes {
                    frame.check_shape(field, node)?;
                }
                trace!(field, index, count = nodes.len(), "insert after");
                frame.queue_next(nodes);
                frame.changed = true;
                stack.push(Frame::new(child));
            }
            Control::Splice(nodes) => {
                for node in &nodes {
                    frame.check_shape(field, node)?;
                }
                trace!(field, index, count = nodes.len(), "splice");
                frame.queue_next(nodes);
                frame.changed = true;
            }
            Control::Quit => {
                return Err(Error::TraversalAborted {
                    location: child.location().clone(),
                })
            }
        }
    }

    Err(Error::InvalidState("traversal ended without a root".into()))
}

/// [`transform`] for the common case of a journal root.
pub fn transform_journal<V: NodeVisitor + ?Sized>(
    journal: Journal,
    visitor: &mut V,
) -> Result<Journal> {
    transform(Node::Journal(journal), visitor)?
        .into_journal()
        .ok_or_else(|| {
            Error::InvalidState("journal root was replaced by another kind of node".into())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use anyhow::Result;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn close(account: &str) -> JournalDeclaration {
        CloseDirective::builder()
            .date(date(1))
            .account(Account::from(account))
            .build()
            .map(Directive::Close)
            .unwrap()
            .into()
    }

    fn txn(narration: &str, accounts: &[&str]) -> JournalDeclaration {
        let postings = accounts
            .iter()
            .map(|a| Posting::builder().account(Account::from(*a)).build().unwrap())
            .collect::<Vec<_>>();
        TransactionDirective::builder()
            .date(date(2))
            .flag(Flag::Settled)
            .narration(Some(narration))
            .postings(postings)
            .build()
            .map(Directive::Transaction)
            .unwrap()
            .into()
    }

    fn accounts(journal: &Journal) -> Vec<String> {
        journal
            .directives()
            .filter_map(|d| match d {
                Directive::Close(c) => Some(c.account().to_string()),
                _ => None,
            })
            .collect()
    }

    struct Recorder(Vec<String>);

    impl NodeVisitor for Recorder {
        fn visit_close(
            &mut self,
            node: &CloseDirective,
            context: &TraverserContext<'_>,
        ) -> Control {
            self.0.push(format!("{}@{}", node.account(), context.index));
            Control::Continue
        }

        fn visit_posting(&mut self, node: &Posting, context: &TraverserContext<'_>) -> Control {
            self.0.push(format!("{}@{}:{}", node.account(), context.depth, context.index));
            Control::Continue
        }
    }

    #[test]
    fn walks_pre_order_and_keeps_identity() -> Result<()> {
        let journal = Journal::new(vec![
            close("Assets:A"),
            txn("lunch", &["Assets:Cash", "Expenses:Food"]),
            close("Assets:B"),
        ]);
        let mut recorder = Recorder(vec![]);
        let result = transform_journal(journal.clone(), &mut recorder)?;

        assert_eq!(result, journal);
        assert_eq!(
            recorder.0,
            vec![
                "Assets:A@0",
                "Assets:Cash@2:0",
                "Expenses:Food@2:1",
                "Assets:B@2"
            ]
        );
        Ok(())
    }

    struct Edit(&'static str, Control);

    impl NodeVisitor for Edit {
        fn visit_close(&mut self, node: &CloseDirective, _: &TraverserContext<'_>) -> Control {
            if node.account().as_str() == self.0 {
                std::mem::replace(&mut self.1, Control::Continue)
            } else {
                Control::Continue
            }
        }
    }

    #[test]
    fn delete_and_replace_leave_siblings_alone() -> Result<()> {
        let journal = Journal::new(vec![close("Assets:A"), close("Assets:B"), close("Assets:C")]);

        let deleted = transform_journal(journal.clone(), &mut Edit("Assets:B", Control::Delete))?;
        assert_eq!(accounts(&deleted), vec!["Assets:A", "Assets:C"]);
        assert_eq!(deleted.declarations()[0], journal.declarations()[0]);
        assert_eq!(deleted.declarations()[1], journal.declarations()[2]);

        let replaced = transform_journal(
            journal.clone(),
            &mut Edit("Assets:B", Control::Replace(close("Assets:Z").into())),
        )?;
        assert_eq!(accounts(&replaced), vec!["Assets:A", "Assets:Z", "Assets:C"]);
        assert_eq!(accounts(&journal), vec!["Assets:A", "Assets:B", "Assets:C"]);
        Ok(())
    }

    #[test]
    fn inserted_siblings_are_visited() -> Result<()> {
        struct Expand(Vec<String>);

        impl NodeVisitor for Expand {
            fn visit_close(&mut self, node: &CloseDirective, _: &TraverserContext<'_>) -> Control {
                self.0.push(node.account().to_string());
                match node.account().as_str() {
                    "Assets:A" => Control::InsertAfter(vec![close("Assets:X").into()]),
                    "Assets:X" => Control::Splice(vec![close("Assets:Y").into()]),
                    _ => Control::Continue,
                }
            }
        }

        let journal = Journal::new(vec![close("Assets:A"), close("Assets:B")]);
        let mut expand = Expand(vec![]);
        let result = transform_journal(journal, &mut expand)?;

        assert_eq!(expand.0, vec!["Assets:A", "Assets:X", "Assets:Y", "Assets:B"]);
        assert_eq!(accounts(&result), vec!["Assets:A", "Assets:Y", "Assets:B"]);
        Ok(())
    }

    #[test]
    fn nested_edits_rebuild_ancestors() -> Result<()> {
        struct DropCash;

        impl NodeVisitor for DropCash {
            fn visit_posting(&mut self, node: &Posting, _: &TraverserContext<'_>) -> Control {
                if node.account().as_str() == "Assets:Cash" {
                    Control::Delete
                } else {
                    Control::Continue
                }
            }
        }

        let journal = Journal::new(vec![txn("lunch", &["Assets:Cash", "Expenses:Food"])]);
        let result = transform_journal(journal.clone(), &mut DropCash)?;

        let Some(Directive::Transaction(rewritten)) = result.directives().next() else {
            panic!("transaction expected");
        };
        assert_eq!(rewritten.postings().len(), 1);
        assert_eq!(rewritten.postings()[0].account().as_str(), "Expenses:Food");
        assert_eq!(rewritten.narration(), Some("lunch"));

        let Some(Directive::Transaction(original)) = journal.directives().next() else {
            panic!("transaction expected");
        };
        assert_eq!(original.postings().len(), 2);
        Ok(())
    }

    #[test]
    fn quit_aborts() {
        let journal = Journal::new(vec![close("Assets:A"), close("Assets:B")]);
        let result = transform_journal(journal, &mut Edit("Assets:B", Control::Quit));
        assert!(matches!(result, Err(Error::TraversalAborted { .. })));
    }

    #[test]
    fn incompatible_edit_fails_fast() -> Result<()> {
        let posting = Posting::builder().account(Account::from("Assets:Cash")).build()?;
        let journal = Journal::new(vec![close("Assets:A")]);
        let result = transform_journal(
            journal,
            &mut Edit("Assets:A", Control::Replace(Node::Posting(posting))),
        );
        assert!(matches!(
            result,
            Err(Error::IncompatibleChild {
                parent: "Journal",
                field: "declarations",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn root_cannot_be_deleted() {
        struct DeleteRoot;

        impl NodeVisitor for DeleteRoot {
            fn visit_journal(&mut self, _: &Journal, _: &TraverserContext<'_>) -> Control {
                Control::Delete
            }
        }

        let result = transform_journal(Journal::new(vec![]), &mut DeleteRoot);
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }
}
