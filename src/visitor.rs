//! Per-node callbacks driving the rewrite engine in [`crate::transformer`].

use crate::ast::*;

/// What the engine should do with the node a callback was given.
#[derive(Clone, Debug, PartialEq)]
pub enum Control {
    /// Keep the node and descend into its children.
    Continue,
    /// Stop the whole traversal. The engine reports it as an error.
    Quit,
    /// Put another node in place of the current one. The replacement is not
    /// handed to the visitor again but its children are walked.
    Replace(Node),
    /// Drop the current node from its parent's list.
    Delete,
    /// Keep the current node and add siblings right after it. They are
    /// visited next, in order.
    InsertAfter(Vec<Node>),
    /// Delete the current node and put the given siblings in its place.
    /// They are visited next, in order.
    Splice(Vec<Node>),
}

/// Where the visited node sits.
#[derive(Clone, Copy, Debug)]
pub struct TraverserContext<'a> {
    /// Parent as it was before the traversal touched it. `None` for the root.
    pub parent: Option<&'a Node>,
    pub field: Option<&'static str>,
    /// Position the node takes in the rebuilt child list.
    pub index: usize,
    pub depth: usize,
}

impl TraverserContext<'_> {
    pub fn root() -> Self {
        TraverserContext {
            parent: None,
            field: None,
            index: 0,
            depth: 0,
        }
    }

    pub fn is_top_level(&self) -> bool {
        matches!(self.parent, Some(Node::Journal(_)))
    }
}

macro_rules! node_visitor {
    ($($short:ident: $ty:ty),* $(,)?) => {
        camelpaste::paste! {
            /// One callback per concrete node type. Every callback defaults to
            /// [`Control::Continue`], so visitors only override what they care
            /// about.
            pub trait NodeVisitor {
                $(
                    fn [<visit_ $short>](
                        &mut self,
                        _node: &$ty,
                        _context: &TraverserContext<'_>,
                    ) -> Control {
                        Control::Continue
                    }
                )*
            }
        }
    };
}

node_visitor! {
    journal: Journal,
    transaction: TransactionDirective,
    posting: Posting,
    balance: BalanceDirective,
    pad: PadDirective,
    open: OpenDirective,
    close: CloseDirective,
    event: EventDirective,
    price: PriceDirective,
    note: NoteDirective,
    commodity: CommodityDirective,
    query: QueryDirective,
    custom: CustomDirective,
    document: DocumentDirective,
    include: IncludePragma,
    option: OptionPragma,
    plugin: PluginPragma,
    pushtag: PushtagPragma,
    poptag: PoptagPragma,
    comment: Comment,
    eol: Eol,
}

pub(crate) fn accept<V: NodeVisitor + ?Sized>(
    visitor: &mut V,
    node: &Node,
    context: &TraverserContext<'_>,
) -> Control {
    match node {
        Node::Journal(journal) => visitor.visit_journal(journal, context),
        Node::Posting(posting) => visitor.visit_posting(posting, context),
        Node::Declaration(JournalDeclaration::Directive(directive)) => match directive {
            Directive::Transaction(d) => visitor.visit_transaction(d, context),
            Directive::Balance(d) => visitor.visit_balance(d, context),
            Directive::Pad(d) => visitor.visit_pad(d, context),
            Directive::Open(d) => visitor.visit_open(d, context),
            Directive::Close(d) => visitor.visit_close(d, context),
            Directive::Event(d) => visitor.visit_event(d, context),
            Directive::Price(d) => visitor.visit_price(d, context),
            Directive::Note(d) => visitor.visit_note(d, context),
            Directive::Commodity(d) => visitor.visit_commodity(d, context),
            Directive::Query(d) => visitor.visit_query(d, context),
            Directive::Custom(d) => visitor.visit_custom(d, context),
            Directive::Document(d) => visitor.visit_document(d, context),
        },
        Node::Declaration(JournalDeclaration::Pragma(pragma)) => match pragma {
            Pragma::Include(p) => visitor.visit_include(p, context),
            Pragma::Option(p) => visitor.visit_option(p, context),
            Pragma::Plugin(p) => visitor.visit_plugin(p, context),
            Pragma::Pushtag(p) => visitor.visit_pushtag(p, context),
            Pragma::Poptag(p) => visitor.visit_poptag(p, context),
        },
        Node::Declaration(JournalDeclaration::Comment(comment)) => {
            visitor.visit_comment(comment, context)
        }
        Node::Declaration(JournalDeclaration::Eol(eol)) => visitor.visit_eol(eol, context),
    }
}
