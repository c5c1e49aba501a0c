use super::values::{
    account, amount, commodity, cost, date, expr, flag, link, metadata_value, next_pair,
    parse_next, price, string, tag, tags_links,
};
use super::Rule;
use crate::ast::*;
use anyhow::{bail, Result};
use pest::iterators::Pair;
use std::path::PathBuf;
use std::sync::Arc;

/// Turns pest pairs into AST nodes, stamping each with its source location.
pub(super) struct Lowering {
    file: Option<Arc<PathBuf>>,
}

#[derive(Default)]
struct Trailer {
    tags_and_links: Vec<TagOrLink>,
    comment: Option<String>,
    metadata: Metadata,
}

fn comment_text(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|text| text.as_str().to_string())
        .unwrap_or_default()
}

impl Lowering {
    pub(super) fn new(file: Option<Arc<PathBuf>>) -> Self {
        Self { file }
    }

    pub(super) fn location(&self, pair: &Pair<Rule>) -> SourceLocation {
        let span = pair.as_span();
        let (start_line, start_col) = span.start_pos().line_col();
        let (end_line, end_col) = span.end_pos().line_col();
        SourceLocation::new(
            self.file.clone(),
            Position::new(start_line, start_col),
            Position::new(end_line, end_col),
        )
    }

    pub(super) fn declaration(&self, pair: Pair<Rule>) -> Result<JournalDeclaration> {
        let location = self.location(&pair);

        let declaration: JournalDeclaration = match pair.as_rule() {
            Rule::blank_line => Eol::builder().location(location).build()?.into(),
            Rule::comment_line => self
                .comment(next_pair(&mut pair.into_inner(), Rule::comment)?)?
                .into(),
            Rule::include => Pragma::Include(self.include(pair)?).into(),
            Rule::option => Pragma::Option(self.option(pair)?).into(),
            Rule::plugin => Pragma::Plugin(self.plugin(pair)?).into(),
            Rule::pushtag => Pragma::Pushtag(self.pushtag(pair)?).into(),
            Rule::poptag => Pragma::Poptag(self.poptag(pair)?).into(),
            Rule::transaction => Directive::Transaction(self.transaction(pair)?).into(),
            Rule::balance => Directive::Balance(self.balance(pair)?).into(),
            Rule::pad => Directive::Pad(self.pad(pair)?).into(),
            Rule::open => Directive::Open(self.open(pair)?).into(),
            Rule::close => Directive::Close(self.close(pair)?).into(),
            Rule::event => Directive::Event(self.event(pair)?).into(),
            Rule::price_directive => Directive::Price(self.price(pair)?).into(),
            Rule::note => Directive::Note(self.note(pair)?).into(),
            Rule::commodity_directive => Directive::Commodity(self.commodity(pair)?).into(),
            Rule::query => Directive::Query(self.query(pair)?).into(),
            Rule::custom => Directive::Custom(self.custom(pair)?).into(),
            Rule::document => Directive::Document(self.document(pair)?).into(),
            other => bail!("unexpected token: {:?} '{}'", other, pair.as_str()),
        };

        Ok(declaration)
    }

    fn comment(&self, pair: Pair<Rule>) -> Result<Comment> {
        let location = self.location(&pair);
        Ok(Comment::builder()
            .location(location)
            .text(comment_text(pair))
            .build()?)
    }

    fn metadata(&self, pair: Pair<Rule>) -> Result<Metadata> {
        pair.into_inner()
            .map(|line| {
                Ok(match line.as_rule() {
                    Rule::meta_item => {
                        let mut inner = line.into_inner();
                        let key = next_pair(&mut inner, Rule::meta_key)?.as_str();
                        let value = inner.next().map(metadata_value).transpose()?;
                        MetadataLine::Item(MetadataItem::new(key, value))
                    }
                    Rule::tag => MetadataLine::Tag(tag(line)?),
                    Rule::link => MetadataLine::Link(link(line)?),
                    Rule::comment => MetadataLine::Comment(self.comment(line)?),
                    other => bail!("unexpected token in metadata: {:?}", other),
                })
            })
            .collect()
    }

    fn trailer<'i>(&self, pairs: impl IntoIterator<Item = Pair<'i, Rule>>) -> Result<Trailer> {
        let mut trailer = Trailer::default();
        for pair in pairs {
            match pair.as_rule() {
                Rule::tags_links => trailer.tags_and_links = tags_links(pair)?,
                Rule::comment => trailer.comment = Some(comment_text(pair)),
                Rule::metadata => trailer.metadata = self.metadata(pair)?,
                other => bail!("unexpected token after directive: {:?} '{}'", other, pair.as_str()),
            }
        }
        Ok(trailer)
    }

    /// Trailing `;comment` of a pragma line, if any.
    fn pragma_comment<'i>(
        pairs: impl IntoIterator<Item = Pair<'i, Rule>>,
    ) -> Result<Option<String>> {
        let mut comment = None;
        for pair in pairs {
            match pair.as_rule() {
                Rule::comment => comment = Some(comment_text(pair)),
                other => bail!("unexpected token after pragma: {:?}", other),
            }
        }
        Ok(comment)
    }

    fn include(&self, pair: Pair<Rule>) -> Result<IncludePragma> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let filename = parse_next!(string, pairs);
        Ok(IncludePragma::builder()
            .location(location)
            .filename(filename)
            .comment(Self::pragma_comment(pairs)?)
            .build()?)
    }

    fn option(&self, pair: Pair<Rule>) -> Result<OptionPragma> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let name = parse_next!(string, pairs);
        let value = parse_next!(string, pairs);
        Ok(OptionPragma::builder()
            .location(location)
            .name(name)
            .value(value)
            .comment(Self::pragma_comment(pairs)?)
            .build()?)
    }

    fn plugin(&self, pair: Pair<Rule>) -> Result<PluginPragma> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let name = parse_next!(string, pairs);
        let mut config = None;
        let mut rest = vec![];
        for p in pairs {
            match p.as_rule() {
                Rule::string => config = Some(string(p)?),
                _ => rest.push(p),
            }
        }
        Ok(PluginPragma::builder()
            .location(location)
            .name(name)
            .config(config)
            .comment(Self::pragma_comment(rest)?)
            .build()?)
    }

    fn pushtag(&self, pair: Pair<Rule>) -> Result<PushtagPragma> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let tag = parse_next!(tag, pairs);
        Ok(PushtagPragma::builder()
            .location(location)
            .tag(tag)
            .comment(Self::pragma_comment(pairs)?)
            .build()?)
    }

    fn poptag(&self, pair: Pair<Rule>) -> Result<PoptagPragma> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let tag = parse_next!(tag, pairs);
        Ok(PoptagPragma::builder()
            .location(location)
            .tag(tag)
            .comment(Self::pragma_comment(pairs)?)
            .build()?)
    }

    fn transaction(&self, pair: Pair<Rule>) -> Result<TransactionDirective> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let date = parse_next!(date, pairs);
        let flag = flag(next_pair(&mut pairs, Rule::txn_flag)?)?;

        let mut strings = vec![];
        let mut postings = vec![];
        let mut rest = vec![];
        for p in pairs {
            match p.as_rule() {
                Rule::string => strings.push(string(p)?),
                Rule::posting => postings.push(self.posting(p)?),
                _ => rest.push(p),
            }
        }
        // a lone string is the narration
        let narration = strings.pop();
        let payee = strings.pop();
        let trailer = self.trailer(rest)?;

        Ok(TransactionDirective::builder()
            .location(location)
            .date(date)
            .flag(flag)
            .payee(payee)
            .narration(narration)
            .tags_and_links(trailer.tags_and_links)
            .metadata(trailer.metadata)
            .postings(postings)
            .comment(trailer.comment)
            .build()?)
    }

    fn posting(&self, pair: Pair<Rule>) -> Result<Posting> {
        let mut builder = Posting::builder().location(self.location(&pair));
        for p in pair.into_inner() {
            builder = match p.as_rule() {
                Rule::posting_flag => builder.flag(flag(p)?),
                Rule::account => builder.account(account(p)?),
                Rule::expr => builder.amount(expr(p)?),
                Rule::commodity => builder.commodity(commodity(p)?),
                Rule::cost => builder.cost(cost(p)?),
                Rule::price => builder.price(price(p)?),
                Rule::comment => builder.comment(Some(comment_text(p))),
                Rule::metadata => builder.metadata(self.metadata(p)?),
                other => bail!("unexpected token in posting: {:?} '{}'", other, p.as_str()),
            };
        }
        Ok(builder.build()?)
    }

    fn balance(&self, pair: Pair<Rule>) -> Result<BalanceDirective> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let date = parse_next!(date, pairs);
        let account = parse_next!(account, pairs);
        let amount = parse_next!(amount, pairs);
        let trailer = self.trailer(pairs)?;

        Ok(BalanceDirective::builder()
            .location(location)
            .date(date)
            .account(account)
            .amount(amount)
            .tags_and_links(trailer.tags_and_links)
            .metadata(trailer.metadata)
            .comment(trailer.comment)
            .build()?)
    }

    fn pad(&self, pair: Pair<Rule>) -> Result<PadDirective> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let date = parse_next!(date, pairs);
        let target = parse_next!(account, pairs);
        let source = parse_next!(account, pairs);
        let trailer = self.trailer(pairs)?;

        Ok(PadDirective::builder()
            .location(location)
            .date(date)
            .account(target)
            .source_account(source)
            .tags_and_links(trailer.tags_and_links)
            .metadata(trailer.metadata)
            .comment(trailer.comment)
            .build()?)
    }

    fn open(&self, pair: Pair<Rule>) -> Result<OpenDirective> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let date = parse_next!(date, pairs);
        let account = parse_next!(account, pairs);

        let mut commodities = vec![];
        let mut booking = None;
        let mut rest = vec![];
        for p in pairs {
            match p.as_rule() {
                Rule::commodity_list => {
                    commodities = p.into_inner().map(commodity).collect::<Result<_>>()?
                }
                Rule::string => booking = Some(string(p)?),
                _ => rest.push(p),
            }
        }
        let trailer = self.trailer(rest)?;

        Ok(OpenDirective::builder()
            .location(location)
            .date(date)
            .account(account)
            .commodities(commodities)
            .booking(booking)
            .tags_and_links(trailer.tags_and_links)
            .metadata(trailer.metadata)
            .comment(trailer.comment)
            .build()?)
    }

    fn close(&self, pair: Pair<Rule>) -> Result<CloseDirective> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let date = parse_next!(date, pairs);
        let account = parse_next!(account, pairs);
        let trailer = self.trailer(pairs)?;

        Ok(CloseDirective::builder()
            .location(location)
            .date(date)
            .account(account)
            .tags_and_links(trailer.tags_and_links)
            .metadata(trailer.metadata)
            .comment(trailer.comment)
            .build()?)
    }

    fn event(&self, pair: Pair<Rule>) -> Result<EventDirective> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let date = parse_next!(date, pairs);
        let event_type = parse_next!(string, pairs);
        let description = parse_next!(string, pairs);
        let trailer = self.trailer(pairs)?;

        Ok(EventDirective::builder()
            .location(location)
            .date(date)
            .event_type(event_type)
            .description(description)
            .tags_and_links(trailer.tags_and_links)
            .metadata(trailer.metadata)
            .comment(trailer.comment)
            .build()?)
    }

    fn price(&self, pair: Pair<Rule>) -> Result<PriceDirective> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let date = parse_next!(date, pairs);
        let commodity = parse_next!(commodity, pairs);
        let price = parse_next!(amount, pairs);
        let trailer = self.trailer(pairs)?;

        Ok(PriceDirective::builder()
            .location(location)
            .date(date)
            .commodity(commodity)
            .price(price)
            .tags_and_links(trailer.tags_and_links)
            .metadata(trailer.metadata)
            .comment(trailer.comment)
            .build()?)
    }

    fn note(&self, pair: Pair<Rule>) -> Result<NoteDirective> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let date = parse_next!(date, pairs);
        let account = parse_next!(account, pairs);
        let note = parse_next!(string, pairs);
        let trailer = self.trailer(pairs)?;

        Ok(NoteDirective::builder()
            .location(location)
            .date(date)
            .account(account)
            .note(note)
            .tags_and_links(trailer.tags_and_links)
            .metadata(trailer.metadata)
            .comment(trailer.comment)
            .build()?)
    }

    fn commodity(&self, pair: Pair<Rule>) -> Result<CommodityDirective> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let date = parse_next!(date, pairs);
        let commodity = parse_next!(commodity, pairs);
        let trailer = self.trailer(pairs)?;

        Ok(CommodityDirective::builder()
            .location(location)
            .date(date)
            .commodity(commodity)
            .tags_and_links(trailer.tags_and_links)
            .metadata(trailer.metadata)
            .comment(trailer.comment)
            .build()?)
    }

    fn query(&self, pair: Pair<Rule>) -> Result<QueryDirective> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let date = parse_next!(date, pairs);
        let name = parse_next!(string, pairs);
        let sql = parse_next!(string, pairs);
        let trailer = self.trailer(pairs)?;

        Ok(QueryDirective::builder()
            .location(location)
            .date(date)
            .name(name)
            .sql(sql)
            .tags_and_links(trailer.tags_and_links)
            .metadata(trailer.metadata)
            .comment(trailer.comment)
            .build()?)
    }

    fn custom(&self, pair: Pair<Rule>) -> Result<CustomDirective> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let date = parse_next!(date, pairs);
        let name = parse_next!(string, pairs);

        let mut values = vec![];
        let mut rest = vec![];
        for p in pairs {
            match p.as_rule() {
                Rule::tags_links | Rule::comment | Rule::metadata => rest.push(p),
                _ => values.push(metadata_value(p)?),
            }
        }
        let trailer = self.trailer(rest)?;

        Ok(CustomDirective::builder()
            .location(location)
            .date(date)
            .name(name)
            .values(values)
            .tags_and_links(trailer.tags_and_links)
            .metadata(trailer.metadata)
            .comment(trailer.comment)
            .build()?)
    }

    fn document(&self, pair: Pair<Rule>) -> Result<DocumentDirective> {
        let location = self.location(&pair);
        let mut pairs = pair.into_inner();
        let date = parse_next!(date, pairs);
        let account = parse_next!(account, pairs);
        let filename = parse_next!(string, pairs);
        let trailer = self.trailer(pairs)?;

        Ok(DocumentDirective::builder()
            .location(location)
            .date(date)
            .account(account)
            .filename(filename)
            .tags_and_links(trailer.tags_and_links)
            .metadata(trailer.metadata)
            .comment(trailer.comment)
            .build()?)
    }
}
