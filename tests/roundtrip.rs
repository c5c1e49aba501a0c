use anyhow::Result;
use beantree::ast::*;
use beantree::{parse_str, print, Printer, PrinterConfig};
use chrono::NaiveDate;

const CORPUS: &str = r#"option "title" "Jawir"
plugin "beancount.plugins.auto" "config"
include "accounts.bean" ;shared
; free comment

2021-01-01 open Assets:Bank:Jago USD,IDR "FIFO"
2021-01-01 open Expenses:Food
2021-01-01 commodity USD
  name: "US Dollar"
2021-01-02 pad Assets:Bank:Jago Equity:Opening
2021-01-03 balance Assets:Bank:Jago 100.00 USD
2021-01-04 price USD 15,000 IDR
2021-01-05 event "location" "Bandung"
2021-01-06 note Assets:Bank:Jago "called the \"bank\""
2021-01-07 query "cash" "SELECT account"
2021-01-08 custom "fava-option" "insert-entry" "Expenses"
2021-01-09 document Assets:Bank:Jago "statement.pdf" #paper
2021-01-10 * "Warung" "Lunch" #food ^rcpt-1 ;cheap
  category: "dining"
  Expenses:Food  12.50 USD
    receipt: TRUE
    ;kept
  ! Assets:Bank:Jago  -(10 + 2.50) USD
2021-01-11 txn "Stock"
  Assets:Broker  10 ACME {{100 # 5.00 USD, 2021-01-01, "lot"}} @@ 1000 USD
  Assets:Bank:Jago
2021-01-12 * "Only payee" ""
  Assets:Bank:Jago  1 USD @ 15000 IDR
  Expenses:Food

2021-12-31 close Assets:Bank:Jago
"#;

fn assert_stable(printer: &Printer, journal: &Journal) -> Result<()> {
    let first = printer.print(journal)?;
    let second = printer.print(&parse_str(&first, None)?)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn printing_is_idempotent_over_parsing() -> Result<()> {
    let journal = parse_str(CORPUS, None)?;
    assert_stable(&Printer::default(), &journal)?;

    let compact = Printer::new(PrinterConfig::builder().compact(true).indentation("\t").build()?)?;
    assert_stable(&compact, &journal)?;

    let narrow = Printer::new(PrinterConfig::builder().currency_column(0).build()?)?;
    assert_stable(&narrow, &journal)?;
    Ok(())
}

#[test]
fn built_journal_prints_stably() -> Result<()> {
    let date = NaiveDate::from_ymd_opt(2022, 3, 4).unwrap();
    let posting = Posting::builder()
        .account(Account::from("Assets:Cash"))
        .amount(ArithmeticExpression::constant("5").negate())
        .commodity(Commodity::from("EUR"))
        .comment(Some("change"))
        .build()?;
    let txn = TransactionDirective::builder()
        .date(date)
        .flag(Flag::Settled)
        .narration(Some("Bakery"))
        .tags_and_links(vec![TagOrLink::Tag("food".into())])
        .metadata(Metadata::new(vec![MetadataLine::Item(MetadataItem::string(
            "shop", "Roti",
        ))]))
        .postings(vec![
            posting,
            Posting::builder().account(Account::from("Expenses:Food")).build()?,
        ])
        .build()?;
    let balance = BalanceDirective::builder()
        .date(date)
        .account(Account::from("Assets:Cash"))
        .amount(Amount::new(ArithmeticExpression::constant("95"), "EUR"))
        .build()?;

    let journal = Journal::new(vec![
        Directive::Transaction(txn).into(),
        Directive::Balance(balance).into(),
        Comment::new(" done").into(),
    ]);

    let text = print(&journal)?;
    assert!(text.starts_with("2022-03-04 * \"Bakery\" #food\n  shop: \"Roti\"\n  Assets:Cash "));
    assert!(text.contains(" -5 EUR ;change\n  Expenses:Food\n\n2022-03-04 balance Assets:Cash "));
    assert!(text.ends_with("95 EUR\n; done\n"));

    assert_stable(&Printer::default(), &journal)?;
    Ok(())
}

#[test]
fn transform_leaves_the_original_alone() -> Result<()> {
    let journal = parse_str("2021-01-01 open Assets:Cash USD\n", None)?;
    let Some(Directive::Open(open)) = journal.directives().next() else {
        panic!("open expected");
    };

    let renamed = open.transform(|draft| draft.account = Account::from("Assets:Wallet"));
    assert_eq!(open.account().as_str(), "Assets:Cash");
    assert_eq!(renamed.account().as_str(), "Assets:Wallet");
    assert_eq!(renamed.commodities(), open.commodities());
    assert_eq!(renamed.date(), open.date());
    Ok(())
}
