use super::location::SourceLocation;
use super::metadata::Metadata;
use super::node::{Node, NodeKind};
use super::values::{
    Account, Amount, ArithmeticExpression, Commodity, CostSpec, Flag, MetadataValue,
    PriceAnnotation, TagOrLink,
};
use super::{AstNode, NamedChildren};
use crate::error::{Error, Result};
use chrono::NaiveDate;

ast_node! {
    /// One leg of a transaction.
    pub struct Posting {
        required { account: Account }
        defaulted { metadata: Metadata }
        optional {
            flag: Flag,
            amount: ArithmeticExpression,
            commodity: Commodity,
            cost: CostSpec,
            price: PriceAnnotation,
        }
        optional_text { comment }
    }
}

ast_node! {
    pub struct TransactionDirective {
        required { date: NaiveDate, flag: Flag }
        defaulted {
            tags_and_links: Vec<TagOrLink>,
            metadata: Metadata,
            postings: Vec<Posting>,
        }
        optional_text { payee, narration, comment }
    }
}

ast_node! {
    pub struct BalanceDirective {
        required { date: NaiveDate, account: Account, amount: Amount }
        defaulted { tags_and_links: Vec<TagOrLink>, metadata: Metadata }
        optional_text { comment }
    }
}

ast_node! {
    pub struct PadDirective {
        required { date: NaiveDate, account: Account, source_account: Account }
        defaulted { tags_and_links: Vec<TagOrLink>, metadata: Metadata }
        optional_text { comment }
    }
}

ast_node! {
    pub struct OpenDirective {
        required { date: NaiveDate, account: Account }
        defaulted {
            commodities: Vec<Commodity>,
            tags_and_links: Vec<TagOrLink>,
            metadata: Metadata,
        }
        optional_text { booking, comment }
    }
}

ast_node! {
    pub struct CloseDirective {
        required { date: NaiveDate, account: Account }
        defaulted { tags_and_links: Vec<TagOrLink>, metadata: Metadata }
        optional_text { comment }
    }
}

ast_node! {
    pub struct EventDirective {
        required { date: NaiveDate }
        text { event_type, description }
        defaulted { tags_and_links: Vec<TagOrLink>, metadata: Metadata }
        optional_text { comment }
    }
}

ast_node! {
    pub struct PriceDirective {
        required { date: NaiveDate, commodity: Commodity, price: Amount }
        defaulted { tags_and_links: Vec<TagOrLink>, metadata: Metadata }
        optional_text { comment }
    }
}

ast_node! {
    pub struct NoteDirective {
        required { date: NaiveDate, account: Account }
        text { note }
        defaulted { tags_and_links: Vec<TagOrLink>, metadata: Metadata }
        optional_text { comment }
    }
}

ast_node! {
    pub struct CommodityDirective {
        required { date: NaiveDate, commodity: Commodity }
        defaulted { tags_and_links: Vec<TagOrLink>, metadata: Metadata }
        optional_text { comment }
    }
}

ast_node! {
    pub struct QueryDirective {
        required { date: NaiveDate }
        text { name, sql }
        defaulted { tags_and_links: Vec<TagOrLink>, metadata: Metadata }
        optional_text { comment }
    }
}

ast_node! {
    pub struct CustomDirective {
        required { date: NaiveDate }
        text { name }
        defaulted {
            values: Vec<MetadataValue>,
            tags_and_links: Vec<TagOrLink>,
            metadata: Metadata,
        }
        optional_text { comment }
    }
}

ast_node! {
    pub struct DocumentDirective {
        required { date: NaiveDate, account: Account }
        text { filename }
        defaulted { tags_and_links: Vec<TagOrLink>, metadata: Metadata }
        optional_text { comment }
    }
}

leaf_node!(
    Posting,
    BalanceDirective,
    PadDirective,
    OpenDirective,
    CloseDirective,
    EventDirective,
    PriceDirective,
    NoteDirective,
    CommodityDirective,
    QueryDirective,
    CustomDirective,
    DocumentDirective,
);

pub(crate) const POSTINGS: &str = "postings";

impl AstNode for TransactionDirective {
    fn named_children(&self) -> NamedChildren {
        let mut children = NamedChildren::new();
        children.insert(
            POSTINGS,
            self.postings.iter().cloned().map(Node::Posting).collect(),
        );
        children
    }

    fn with_new_children(&self, mut children: NamedChildren) -> Result<Self> {
        let nodes = children.shift_remove(POSTINGS).unwrap_or_default();
        if let Some(field) = children.keys().next() {
            return Err(Error::InvalidState(format!(
                "TransactionDirective has no child field `{}'",
                field
            )));
        }

        let postings = nodes
            .into_iter()
            .map(|node| match node {
                Node::Posting(posting) => Ok(posting),
                other => Err(Error::IncompatibleChild {
                    parent: "TransactionDirective",
                    field: POSTINGS,
                    expected: NodeKind::Posting,
                    found: other.kind(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(self.transform(|draft| draft.postings = postings))
    }
}

/// Dated journal entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
    Transaction(TransactionDirective),
    Balance(BalanceDirective),
    Pad(PadDirective),
    Open(OpenDirective),
    Close(CloseDirective),
    Event(EventDirective),
    Price(PriceDirective),
    Note(NoteDirective),
    Commodity(CommodityDirective),
    Query(QueryDirective),
    Custom(CustomDirective),
    Document(DocumentDirective),
}

macro_rules! each_directive {
    ($value:expr, $d:ident => $body:expr) => {
        match $value {
            Directive::Transaction($d) => $body,
            Directive::Balance($d) => $body,
            Directive::Pad($d) => $body,
            Directive::Open($d) => $body,
            Directive::Close($d) => $body,
            Directive::Event($d) => $body,
            Directive::Price($d) => $body,
            Directive::Note($d) => $body,
            Directive::Commodity($d) => $body,
            Directive::Query($d) => $body,
            Directive::Custom($d) => $body,
            Directive::Document($d) => $body,
        }
    };
}

macro_rules! map_directive {
    ($value:expr, $d:ident => $body:expr) => {
        match $value {
            Directive::Transaction($d) => Directive::Transaction($body),
            Directive::Balance($d) => Directive::Balance($body),
            Directive::Pad($d) => Directive::Pad($body),
            Directive::Open($d) => Directive::Open($body),
            Directive::Close($d) => Directive::Close($body),
            Directive::Event($d) => Directive::Event($body),
            Directive::Price($d) => Directive::Price($body),
            Directive::Note($d) => Directive::Note($body),
            Directive::Commodity($d) => Directive::Commodity($body),
            Directive::Query($d) => Directive::Query($body),
            Directive::Custom($d) => Directive::Custom($body),
            Directive::Document($d) => Directive::Document($body),
        }
    };
}

impl Directive {
    pub fn date(&self) -> &NaiveDate {
        each_directive!(self, d => d.date())
    }

    pub fn location(&self) -> &SourceLocation {
        each_directive!(self, d => d.location())
    }

    pub fn tags_and_links(&self) -> &[TagOrLink] {
        each_directive!(self, d => d.tags_and_links())
    }

    pub fn metadata(&self) -> &Metadata {
        each_directive!(self, d => d.metadata())
    }

    pub fn comment(&self) -> Option<&str> {
        each_directive!(self, d => d.comment())
    }

    /// Keyword following the date on the directive line.
    pub fn keyword(&self) -> &'static str {
        match self {
            Directive::Transaction(_) => "txn",
            Directive::Balance(_) => "balance",
            Directive::Pad(_) => "pad",
            Directive::Open(_) => "open",
            Directive::Close(_) => "close",
            Directive::Event(_) => "event",
            Directive::Price(_) => "price",
            Directive::Note(_) => "note",
            Directive::Commodity(_) => "commodity",
            Directive::Query(_) => "query",
            Directive::Custom(_) => "custom",
            Directive::Document(_) => "document",
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Directive::Transaction(_) => "TransactionDirective",
            Directive::Balance(_) => "BalanceDirective",
            Directive::Pad(_) => "PadDirective",
            Directive::Open(_) => "OpenDirective",
            Directive::Close(_) => "CloseDirective",
            Directive::Event(_) => "EventDirective",
            Directive::Price(_) => "PriceDirective",
            Directive::Note(_) => "NoteDirective",
            Directive::Commodity(_) => "CommodityDirective",
            Directive::Query(_) => "QueryDirective",
            Directive::Custom(_) => "CustomDirective",
            Directive::Document(_) => "DocumentDirective",
        }
    }

    /// Same directive with its metadata replaced.
    pub fn with_metadata(&self, metadata: Metadata) -> Directive {
        map_directive!(self, d => d.transform(|draft| draft.metadata = metadata))
    }
}

impl AstNode for Directive {
    fn named_children(&self) -> NamedChildren {
        each_directive!(self, d => d.named_children())
    }

    fn with_new_children(&self, children: NamedChildren) -> Result<Self> {
        Ok(map_directive!(self, d => d.with_new_children(children)?))
    }
}
