//! Canonical text rendering of a [`Journal`].

use crate::ast::*;
use crate::error::{Error, Result};
use std::fmt::Write;

const DATE_WIDTH: usize = 10;

/// Formatting knobs. The defaults match Fava's layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrinterConfig {
    /// 1-based column where commodities of balances, prices and postings
    /// should start.
    pub currency_column: usize,
    /// One level of indentation, spaces and tabs only.
    pub indentation: String,
    /// No blank line after a transaction's postings.
    pub compact: bool,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            currency_column: 61,
            indentation: "  ".into(),
            compact: false,
        }
    }
}

impl PrinterConfig {
    pub fn builder() -> PrinterConfigBuilder {
        PrinterConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.indentation.is_empty() {
            return Err(Error::InvalidState(
                "the indentation sequence must be nonempty whitespace".into(),
            ));
        }
        if !self.indentation.chars().all(|c| c == ' ' || c == '\t') {
            return Err(Error::InvalidState(format!(
                "the indentation sequence must be composed of spaces and/or tabs, got {:?}",
                self.indentation
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct PrinterConfigBuilder {
    config: PrinterConfig,
}

impl PrinterConfigBuilder {
    pub fn currency_column(mut self, column: usize) -> Self {
        self.config.currency_column = column;
        self
    }

    pub fn indentation(mut self, indentation: impl Into<String>) -> Self {
        self.config.indentation = indentation.into();
        self
    }

    pub fn compact(mut self, compact: bool) -> Self {
        self.config.compact = compact;
        self
    }

    pub fn build(self) -> Result<PrinterConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Renders journals with a fixed configuration. Holds no per-call state, so
/// one printer can serve several threads.
#[derive(Clone, Debug, Default)]
pub struct Printer {
    config: PrinterConfig,
}

impl Printer {
    pub fn new(config: PrinterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    pub fn print(&self, journal: &Journal) -> Result<String> {
        let mut state = State::new(&self.config);
        let declarations = journal.declarations();

        for (i, declaration) in declarations.iter().enumerate() {
            let before_blank = declarations
                .get(i + 1)
                .map_or(false, JournalDeclaration::is_eol);
            state.declaration(declaration, before_blank)?;
        }

        Ok(state.out)
    }
}

/// Prints with the default configuration.
pub fn print(journal: &Journal) -> Result<String> {
    Printer::default().print(journal)
}

struct State<'c> {
    config: &'c PrinterConfig,
    out: String,
    nesting: usize,
    indents: Vec<String>,
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn date(date: &chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Width given to a right aligned amount so the commodity lands on the
/// configured column, never less than one.
fn amount_width(column: usize, used: usize) -> usize {
    column.saturating_sub(used).max(1)
}

fn scalar(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Account(account) => account.to_string(),
        ScalarValue::Expression(expression) => expression.to_string(),
        ScalarValue::Boolean(true) => "TRUE".into(),
        ScalarValue::Boolean(false) => "FALSE".into(),
        ScalarValue::Commodity(commodity) => commodity.to_string(),
        ScalarValue::Date(d) => date(d),
        ScalarValue::Link(link) => format!("^{}", link),
        ScalarValue::Nil => "NULL".into(),
        ScalarValue::String(s) => quoted(s),
        ScalarValue::Tag(tag) => format!("#{}", tag),
    }
}

fn value(value: &MetadataValue) -> String {
    match value {
        MetadataValue::Scalar(s) => scalar(s),
        MetadataValue::Amount(amount) => amount.to_string(),
    }
}

impl<'c> State<'c> {
    fn new(config: &'c PrinterConfig) -> Self {
        Self {
            config,
            out: String::new(),
            nesting: 0,
            indents: vec![String::new()],
        }
    }

    fn indent(&mut self) {
        self.nesting += 1;
        while self.indents.len() <= self.nesting {
            let level = self.indents.len();
            self.indents.push(self.config.indentation.repeat(level));
        }
    }

    fn dedent(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    fn dent(&mut self) {
        if let Some(indent) = self.indents.get(self.nesting) {
            self.out.push_str(indent);
        }
    }

    fn declaration(&mut self, declaration: &JournalDeclaration, before_blank: bool) -> Result<()> {
        match declaration {
            JournalDeclaration::Directive(directive) => self.directive(directive, before_blank),
            JournalDeclaration::Pragma(pragma) => self.pragma(pragma),
            JournalDeclaration::Comment(comment) => {
                writeln!(self.out, ";{}", comment.text())?;
                Ok(())
            }
            JournalDeclaration::Eol(_) => {
                self.out.push('\n');
                Ok(())
            }
        }
    }

    fn pragma(&mut self, pragma: &Pragma) -> Result<()> {
        match pragma {
            Pragma::Include(p) => write!(self.out, "include {}", quoted(p.filename()))?,
            Pragma::Option(p) => write!(
                self.out,
                "option {} {}",
                quoted(p.name()),
                quoted(p.value())
            )?,
            Pragma::Plugin(p) => {
                write!(self.out, "plugin {}", quoted(p.name()))?;
                if let Some(config) = p.config() {
                    write!(self.out, " {}", quoted(config))?;
                }
            }
            Pragma::Pushtag(_) => {
                return Err(Error::Unsupported(
                    "the pushtag pragma is not yet supported by the printer",
                ))
            }
            Pragma::Poptag(_) => {
                return Err(Error::Unsupported(
                    "the poptag pragma is not yet supported by the printer",
                ))
            }
        }
        if let Some(comment) = pragma.comment() {
            write!(self.out, " ;{}", comment)?;
        }
        self.out.push('\n');
        Ok(())
    }

    fn directive(&mut self, directive: &Directive, before_blank: bool) -> Result<()> {
        let config = self.config;
        match directive {
            Directive::Transaction(d) => return self.transaction(d, before_blank),
            Directive::Balance(d) => {
                let account = d.account().as_str();
                let width = amount_width(
                    config.currency_column,
                    DATE_WIDTH + " balance ".len() + account.chars().count() + 3,
                );
                write!(
                    self.out,
                    "{} balance {} {:>width$} {}",
                    date(d.date()),
                    account,
                    d.amount().expression.to_string(),
                    d.amount().commodity,
                    width = width
                )?;
            }
            Directive::Price(d) => {
                let commodity = d.commodity().as_str();
                let width = amount_width(
                    config.currency_column,
                    DATE_WIDTH + " price ".len() + commodity.chars().count() + 3,
                );
                write!(
                    self.out,
                    "{} price {} {:>width$} {}",
                    date(d.date()),
                    commodity,
                    d.price().expression.to_string(),
                    d.price().commodity,
                    width = width
                )?;
            }
            Directive::Pad(d) => write!(
                self.out,
                "{} pad {} {}",
                date(d.date()),
                d.account(),
                d.source_account()
            )?,
            Directive::Open(d) => {
                write!(self.out, "{} open {}", date(d.date()), d.account())?;
                if !d.commodities().is_empty() {
                    let commodities: Vec<&str> =
                        d.commodities().iter().map(Commodity::as_str).collect();
                    write!(self.out, " {}", commodities.join(","))?;
                }
                if let Some(booking) = d.booking() {
                    write!(self.out, " {}", quoted(booking))?;
                }
            }
            Directive::Close(d) => write!(self.out, "{} close {}", date(d.date()), d.account())?,
            Directive::Event(d) => write!(
                self.out,
                "{} event {} {}",
                date(d.date()),
                quoted(d.event_type()),
                quoted(d.description())
            )?,
            Directive::Note(d) => write!(
                self.out,
                "{} note {} {}",
                date(d.date()),
                d.account(),
                quoted(d.note())
            )?,
            Directive::Commodity(d) => {
                write!(self.out, "{} commodity {}", date(d.date()), d.commodity())?
            }
            Directive::Query(d) => write!(
                self.out,
                "{} query {} {}",
                date(d.date()),
                quoted(d.name()),
                quoted(d.sql())
            )?,
            Directive::Custom(d) => {
                write!(self.out, "{} custom {}", date(d.date()), quoted(d.name()))?;
                for v in d.values() {
                    write!(self.out, " {}", value(v))?;
                }
            }
            Directive::Document(d) => write!(
                self.out,
                "{} document {} {}",
                date(d.date()),
                d.account(),
                quoted(d.filename())
            )?,
        }
        self.directive_tail(directive.tags_and_links(), directive.comment(), directive.metadata())
    }

    /// Tags, links, comment, line break, then the metadata block.
    fn directive_tail(
        &mut self,
        tags_and_links: &[TagOrLink],
        comment: Option<&str>,
        metadata: &Metadata,
    ) -> Result<()> {
        for tag_or_link in tags_and_links {
            write!(self.out, " {}", tag_or_link)?;
        }
        if let Some(comment) = comment {
            write!(self.out, " ;{}", comment)?;
        }
        self.out.push('\n');
        if !metadata.is_empty() {
            self.metadata(metadata)?;
            self.out.push('\n');
        }
        Ok(())
    }

    fn metadata(&mut self, metadata: &Metadata) -> Result<()> {
        self.indent();
        for (i, line) in metadata.lines().iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.dent();
            match line {
                MetadataLine::Item(item) => {
                    write!(self.out, "{}:", item.key)?;
                    if let Some(v) = &item.value {
                        write!(self.out, " {}", value(v))?;
                    }
                }
                MetadataLine::Tag(tag) => write!(self.out, "#{}", tag)?,
                MetadataLine::Link(link) => write!(self.out, "^{}", link)?,
                MetadataLine::Comment(comment) => write!(self.out, ";{}", comment.text())?,
            }
        }
        self.dedent();
        Ok(())
    }

    fn transaction(&mut self, txn: &TransactionDirective, before_blank: bool) -> Result<()> {
        write!(self.out, "{} {}", date(txn.date()), txn.flag())?;
        if let Some(payee) = txn.payee() {
            write!(self.out, " {}", quoted(payee))?;
            if txn.narration().is_none() {
                self.out.push_str(" \"\"");
            }
        }
        if let Some(narration) = txn.narration() {
            write!(self.out, " {}", quoted(narration))?;
        }
        self.directive_tail(txn.tags_and_links(), txn.comment(), txn.metadata())?;

        if txn.postings().is_empty() {
            return Ok(());
        }

        self.indent();
        for (i, posting) in txn.postings().iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.dent();
            self.posting(posting)?;
        }
        self.dedent();

        self.out.push('\n');
        if !self.config.compact && !before_blank {
            self.out.push('\n');
        }
        Ok(())
    }

    fn posting(&mut self, posting: &Posting) -> Result<()> {
        let account = posting.account().as_str();
        let number = posting
            .amount()
            .map(ToString::to_string)
            .unwrap_or_default();
        let commodity = posting.commodity().map_or("", Commodity::as_str);

        let mut flag_width = 0;
        if let Some(flag) = posting.flag() {
            write!(self.out, "{} ", flag)?;
            flag_width = flag.width() + 1;
        }

        if number.is_empty() && commodity.is_empty() {
            self.out.push_str(account);
        } else {
            let width = amount_width(
                self.config.currency_column,
                account.chars().count()
                    + self.config.indentation.chars().count()
                    + flag_width
                    + 3,
            );
            write!(self.out, "{} {:>width$}", account, number, width = width)?;
            if !commodity.is_empty() {
                write!(self.out, " {}", commodity)?;
            }
        }

        if let Some(cost) = posting.cost() {
            self.out.push(' ');
            self.cost(cost)?;
        }
        if let Some(price) = posting.price() {
            self.out.push_str(if price.total { " @@" } else { " @" });
            if let Some(expression) = &price.expression {
                write!(self.out, " {}", expression)?;
            }
            if let Some(commodity) = &price.commodity {
                write!(self.out, " {}", commodity)?;
            }
        }
        if let Some(comment) = posting.comment() {
            write!(self.out, " ;{}", comment)?;
        }
        if !posting.metadata().is_empty() {
            self.out.push('\n');
            self.metadata(posting.metadata())?;
        }
        Ok(())
    }

    fn cost(&mut self, cost: &CostSpec) -> Result<()> {
        self.out.push_str(if cost.double_braces { "{{" } else { "{" });
        for (i, component) in cost.components.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            match component {
                CostComponent::Date(d) => self.out.push_str(&date(d)),
                CostComponent::Label(label) => self.out.push_str(&quoted(label)),
                CostComponent::Amount(amount) => {
                    let mut parts = vec![];
                    match &amount.expression {
                        Some(CompoundExpression::PerUnit(e)) => parts.push(e.to_string()),
                        Some(CompoundExpression::PerUnitAndTotal { per_unit, total }) => {
                            if let Some(e) = per_unit {
                                parts.push(e.to_string());
                            }
                            parts.push("#".into());
                            if let Some(e) = total {
                                parts.push(e.to_string());
                            }
                        }
                        None => {}
                    }
                    if let Some(commodity) = &amount.commodity {
                        parts.push(commodity.to_string());
                    }
                    self.out.push_str(&parts.join(" "));
                }
            }
        }
        self.out.push_str(if cost.double_braces { "}}" } else { "}" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use anyhow::Result;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    fn balance(account: &str) -> Result<Journal> {
        let balance = BalanceDirective::builder()
            .date(day(3))
            .account(Account::from(account))
            .amount(Amount::new(ArithmeticExpression::constant("100.00"), "USD"))
            .build()?;
        Ok(Journal::new(vec![Directive::Balance(balance).into()]))
    }

    #[test]
    fn balance_commodity_lands_on_column() -> Result<()> {
        let text = print(&balance("Assets:Cash")?)?;
        assert!(text.starts_with("2021-01-03 balance Assets:Cash "));
        assert_eq!(text.find("USD"), Some(60));
        assert!(text.ends_with("100.00 USD\n"));
        Ok(())
    }

    #[test]
    fn long_account_keeps_one_space_gap() -> Result<()> {
        let account = format!("Assets:{}", "Very".repeat(20));
        let text = print(&balance(&account)?)?;
        assert_eq!(
            text,
            format!("2021-01-03 balance {} 100.00 USD\n", account)
        );
        Ok(())
    }

    #[test]
    fn postings_align_and_separate() -> Result<()> {
        let journal = parse_str(
            "2021-01-04 * \"Warung\" \"Lunch\"\n  Expenses:Food  12.50 USD\n  ! Assets:Cash\n",
            None,
        )?;
        let text = print(&journal)?;
        let lines: Vec<&str> = text.split('\n').collect();

        assert_eq!(lines[0], "2021-01-04 * \"Warung\" \"Lunch\"");
        assert!(lines[1].starts_with("  Expenses:Food "));
        assert_eq!(lines[1].find("USD"), Some(60));
        assert_eq!(lines[2], "  ! Assets:Cash");
        assert!(text.ends_with("Assets:Cash\n\n"));

        let compact = Printer::new(PrinterConfig::builder().compact(true).build()?)?;
        assert!(compact.print(&journal)?.ends_with("Assets:Cash\n"));
        assert!(!compact.print(&journal)?.ends_with("\n\n"));
        Ok(())
    }

    #[test]
    fn metadata_is_indented_per_level() -> Result<()> {
        let journal = parse_str(
            concat!(
                "2021-01-04 txn \"Lunch\"\n",
                "  note: \"x\"\n",
                "  Expenses:Food  12 USD\n",
                "    seen: 2021-01-05\n",
            ),
            None,
        )?;
        let config = PrinterConfig::builder().indentation("\t").compact(true).build()?;
        let text = Printer::new(config)?.print(&journal)?;
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[1], "\tnote: \"x\"");
        assert!(lines[2].starts_with("\tExpenses:Food "));
        assert_eq!(lines[3], "\t\tseen: 2021-01-05");
        Ok(())
    }

    #[test]
    fn tag_pragmas_are_unsupported() -> Result<()> {
        let journal = parse_str("pushtag #trip\n", None)?;
        assert!(matches!(print(&journal), Err(Error::Unsupported(_))));
        Ok(())
    }

    #[test]
    fn config_is_validated() {
        assert!(matches!(
            PrinterConfig::builder().indentation("").build(),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            PrinterConfig::builder().indentation(" x").build(),
            Err(Error::InvalidState(_))
        ));
        assert!(PrinterConfig::builder().indentation(" \t").build().is_ok());
        assert_eq!(PrinterConfig::default().currency_column, 61);
    }

    #[test]
    fn strings_are_escaped() -> Result<()> {
        let note = NoteDirective::builder()
            .date(day(6))
            .account(Account::from("Assets:Cash"))
            .note("say \"hi\" \\o/")
            .build()?;
        let text = print(&Journal::new(vec![Directive::Note(note).into()]))?;
        assert_eq!(
            text,
            "2021-01-06 note Assets:Cash \"say \\\"hi\\\" \\\\o/\"\n"
        );
        Ok(())
    }
}
