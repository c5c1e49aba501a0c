use super::Rule;
use crate::ast::{
    Account, Amount, ArithmeticExpression, Commodity, CompoundAmount, CompoundExpression,
    CostComponent, CostSpec, Flag, MetadataValue, Number, PriceAnnotation, ScalarValue, TagOrLink,
};
use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use pest::iterators::{Pair, Pairs};

/// Takes the next pair and checks it is a `rule`.
pub(super) fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, rule: Rule) -> Result<Pair<'i, Rule>> {
    let pair = pairs
        .next()
        .ok_or_else(|| anyhow!("invalid next token, expected {:?}", rule))?;
    if pair.as_rule() != rule {
        bail!(
            "unexpected token {:?} '{}', expected {:?}",
            pair.as_rule(),
            pair.as_str(),
            rule
        );
    }
    Ok(pair)
}

/// Lowers the next pair with the function named after its rule.
macro_rules! parse_next {
    ($lower:ident, $pairs:ident) => {
        $lower(next_pair(&mut $pairs, Rule::$lower)?)?
    };
}

pub(super) use parse_next;

pub(super) fn date(pair: Pair<Rule>) -> Result<NaiveDate> {
    let normalised = pair.as_str().replace('/', "-");
    Ok(NaiveDate::parse_from_str(&normalised, "%Y-%m-%d")?)
}

pub(super) fn account(pair: Pair<Rule>) -> Result<Account> {
    Ok(Account::new(pair.as_str()))
}

pub(super) fn commodity(pair: Pair<Rule>) -> Result<Commodity> {
    Ok(Commodity::new(pair.as_str()))
}

pub(super) fn flag(pair: Pair<Rule>) -> Result<Flag> {
    Flag::parse(pair.as_str()).ok_or_else(|| anyhow!("invalid flag: '{}'", pair.as_str()))
}

pub(super) fn string(pair: Pair<Rule>) -> Result<String> {
    let raw = pair
        .into_inner()
        .next()
        .ok_or_else(|| anyhow!("invalid string literal"))?
        .as_str();
    Ok(unescape(raw))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(c @ ('"' | '\\')) => out.push(c),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn tag_name(pair: Pair<Rule>) -> Result<String> {
    Ok(pair
        .into_inner()
        .next()
        .ok_or_else(|| anyhow!("empty tag or link"))?
        .as_str()
        .to_string())
}

pub(super) fn tag(pair: Pair<Rule>) -> Result<String> {
    tag_name(pair)
}

pub(super) fn link(pair: Pair<Rule>) -> Result<String> {
    tag_name(pair)
}

pub(super) fn tags_links(pair: Pair<Rule>) -> Result<Vec<TagOrLink>> {
    pair.into_inner()
        .map(|p| match p.as_rule() {
            Rule::tag => Ok(TagOrLink::Tag(tag_name(p)?)),
            Rule::link => Ok(TagOrLink::Link(tag_name(p)?)),
            other => Err(anyhow!("unexpected token for tags and links: {:?}", other)),
        })
        .collect()
}

pub(super) fn expr(pair: Pair<Rule>) -> Result<ArithmeticExpression> {
    use ArithmeticExpression::*;

    match pair.as_rule() {
        Rule::expr | Rule::term => {
            let mut pairs = pair.into_inner();
            let mut acc = expr(
                pairs
                    .next()
                    .ok_or_else(|| anyhow!("invalid next token, expected operand"))?,
            )?;
            while let Some(op) = pairs.next() {
                let rhs = Box::new(expr(
                    pairs
                        .next()
                        .ok_or_else(|| anyhow!("missing operand after '{}'", op.as_str()))?,
                )?);
                let lhs = Box::new(acc);
                acc = match op.as_str() {
                    "+" => Addition(lhs, rhs),
                    "-" => Subtraction(lhs, rhs),
                    "*" => Multiplication(lhs, rhs),
                    "/" => Division(lhs, rhs),
                    other => bail!("unknown operator '{}'", other),
                };
            }
            Ok(acc)
        }
        Rule::neg | Rule::pos | Rule::paren => {
            let rule = pair.as_rule();
            let inner = expr(
                pair.into_inner()
                    .next()
                    .ok_or_else(|| anyhow!("invalid next token, expected operand"))?,
            )?;
            Ok(match rule {
                Rule::neg => Negation(Box::new(inner)),
                Rule::pos => Plus(Box::new(inner)),
                _ => Parenthesised(Box::new(inner)),
            })
        }
        Rule::number => Ok(Constant(Number::new(pair.as_str()))),
        other => Err(anyhow!(
            "unexpected token for expression: {:?} '{}'",
            other,
            pair.as_str()
        )),
    }
}

pub(super) fn amount(pair: Pair<Rule>) -> Result<Amount> {
    let mut pairs = pair.into_inner();
    Ok(Amount {
        expression: parse_next!(expr, pairs),
        commodity: parse_next!(commodity, pairs),
    })
}

pub(super) fn metadata_value(pair: Pair<Rule>) -> Result<MetadataValue> {
    let scalar = match pair.as_rule() {
        Rule::amount => return Ok(MetadataValue::Amount(amount(pair)?)),
        Rule::string => ScalarValue::String(string(pair)?),
        Rule::date => ScalarValue::Date(date(pair)?),
        Rule::account => ScalarValue::Account(account(pair)?),
        Rule::boolean => ScalarValue::Boolean(pair.as_str() == "TRUE"),
        Rule::nil => ScalarValue::Nil,
        Rule::commodity => ScalarValue::Commodity(commodity(pair)?),
        Rule::tag => ScalarValue::Tag(tag(pair)?),
        Rule::link => ScalarValue::Link(link(pair)?),
        Rule::expr => ScalarValue::Expression(expr(pair)?),
        other => bail!("unexpected token for value: {:?} '{}'", other, pair.as_str()),
    };
    Ok(MetadataValue::Scalar(scalar))
}

pub(super) fn cost(pair: Pair<Rule>) -> Result<CostSpec> {
    let braces = pair
        .into_inner()
        .next()
        .ok_or_else(|| anyhow!("empty cost specification"))?;
    let double_braces = braces.as_rule() == Rule::double_cost;

    let components = braces
        .into_inner()
        .map(|component| match component.as_rule() {
            Rule::date => Ok(CostComponent::Date(date(component)?)),
            Rule::string => Ok(CostComponent::Label(string(component)?)),
            Rule::compound_amount => Ok(CostComponent::Amount(compound_amount(component)?)),
            other => Err(anyhow!("unexpected token in cost: {:?}", other)),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CostSpec {
        double_braces,
        components,
    })
}

fn compound_amount(pair: Pair<Rule>) -> Result<CompoundAmount> {
    let mut compound = CompoundAmount {
        expression: None,
        commodity: None,
    };
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::compound_expr => compound.expression = Some(compound_expr(p)?),
            Rule::commodity => compound.commodity = Some(commodity(p)?),
            other => bail!("unexpected token in compound amount: {:?}", other),
        }
    }
    Ok(compound)
}

fn compound_expr(pair: Pair<Rule>) -> Result<CompoundExpression> {
    let mut per_unit = None;
    let mut total = None;
    let mut has_total = false;

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::expr => per_unit = Some(expr(p)?),
            Rule::total_part => {
                has_total = true;
                total = p.into_inner().next().map(expr).transpose()?;
            }
            other => bail!("unexpected token in compound expression: {:?}", other),
        }
    }

    match (per_unit, has_total) {
        (Some(per_unit), false) => Ok(CompoundExpression::PerUnit(per_unit)),
        (per_unit, true) => Ok(CompoundExpression::PerUnitAndTotal { per_unit, total }),
        (None, false) => Err(anyhow!("empty compound expression")),
    }
}

pub(super) fn price(pair: Pair<Rule>) -> Result<PriceAnnotation> {
    let mut price = PriceAnnotation {
        total: false,
        expression: None,
        commodity: None,
    };
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::price_op => price.total = p.as_str() == "@@",
            Rule::expr => price.expression = Some(expr(p)?),
            Rule::commodity => price.commodity = Some(commodity(p)?),
            other => bail!("unexpected token in price: {:?}", other),
        }
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LedgerParser;
    use pest::Parser;

    fn single(rule: Rule, input: &str) -> Result<Pair<'_, Rule>> {
        LedgerParser::parse(rule, input)?
            .next()
            .ok_or_else(|| anyhow!("empty ast"))
    }

    #[test]
    fn parse_expression_left_assoc() -> Result<()> {
        let e = expr(single(Rule::expr, "10 - 2 - 3 * (4 + -1)")?)?;
        assert_eq!(e.to_string(), "10 - 2 - 3 * (4 + -1)");
        match e {
            ArithmeticExpression::Subtraction(lhs, _) => {
                assert!(matches!(*lhs, ArithmeticExpression::Subtraction(_, _)))
            }
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn parse_slash_date() -> Result<()> {
        assert_eq!(
            date(single(Rule::date, "2021/02/28")?)?,
            NaiveDate::from_ymd_opt(2021, 2, 28).ok_or(anyhow!("invalid date"))?
        );
        Ok(())
    }

    #[test]
    fn parse_escaped_string() -> Result<()> {
        assert_eq!(
            string(single(Rule::string, r#""say \"hi\" \\ there\n""#)?)?,
            "say \"hi\" \\ there\n"
        );
        Ok(())
    }

    #[test]
    fn parse_cost_components() -> Result<()> {
        let spec = cost(single(Rule::cost, r#"{{10 # 5.00 USD, 2021-01-01, "lot"}}"#)?)?;
        assert!(spec.double_braces);
        assert_eq!(spec.components.len(), 3);
        assert_eq!(
            spec.components[0],
            CostComponent::Amount(CompoundAmount {
                expression: Some(CompoundExpression::PerUnitAndTotal {
                    per_unit: Some(ArithmeticExpression::constant("10")),
                    total: Some(ArithmeticExpression::constant("5.00")),
                }),
                commodity: Some(Commodity::from("USD")),
            })
        );
        assert_eq!(spec.components[2], CostComponent::Label("lot".into()));

        let empty = cost(single(Rule::cost, "{}")?)?;
        assert!(!empty.double_braces);
        assert!(empty.components.is_empty());
        Ok(())
    }

    #[test]
    fn parse_total_price() -> Result<()> {
        let p = price(single(Rule::price, "@@ 1,200.00 IDR")?)?;
        assert!(p.total);
        assert_eq!(p.expression, Some(ArithmeticExpression::constant("1200.00")));
        assert_eq!(p.commodity, Some(Commodity::from("IDR")));
        Ok(())
    }
}
