use chrono::NaiveDate;
use std::fmt;

/// Account name, e.g. `Assets:Bank:Jawir`. Kept verbatim; no validation of
/// its root or segments happens here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Account(String);

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(':')
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Account {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Commodity or currency symbol, e.g. `USD`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Commodity(String);

impl Commodity {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Commodity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flag {
    Settled,   // '*'
    Unsettled, // '!'
    Txn,       // the `txn` keyword, same meaning as '*'
    Other(char),
}

impl Flag {
    pub fn parse(token: &str) -> Option<Flag> {
        match token {
            "*" => Some(Flag::Settled),
            "!" => Some(Flag::Unsettled),
            "txn" => Some(Flag::Txn),
            _ => {
                let mut chars = token.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Flag::Other(c)),
                    _ => None,
                }
            }
        }
    }

    /// Width of the flag when printed.
    pub fn width(&self) -> usize {
        match self {
            Flag::Txn => 3,
            Flag::Other(c) => c.len_utf8(),
            _ => 1,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Settled => f.write_str("*"),
            Flag::Unsettled => f.write_str("!"),
            Flag::Txn => f.write_str("txn"),
            Flag::Other(c) => write!(f, "{}", c),
        }
    }
}

/// Tags (`#trip`) and links (`^invoice-42`) share one ordered list on a
/// directive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TagOrLink {
    Tag(String),
    Link(String),
}

impl fmt::Display for TagOrLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagOrLink::Tag(tag) => write!(f, "#{}", tag),
            TagOrLink::Link(link) => write!(f, "^{}", link),
        }
    }
}

/// Decimal literal as written, minus thousands separators. Never evaluated.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Number(String);

impl Number {
    pub fn new(literal: &str) -> Self {
        Self(literal.chars().filter(|&c| c != ',').collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArithmeticExpression {
    Constant(Number),
    Negation(Box<ArithmeticExpression>),
    Parenthesised(Box<ArithmeticExpression>),
    Plus(Box<ArithmeticExpression>),
    Addition(Box<ArithmeticExpression>, Box<ArithmeticExpression>),
    Subtraction(Box<ArithmeticExpression>, Box<ArithmeticExpression>),
    Multiplication(Box<ArithmeticExpression>, Box<ArithmeticExpression>),
    Division(Box<ArithmeticExpression>, Box<ArithmeticExpression>),
}

impl ArithmeticExpression {
    pub fn constant(literal: &str) -> Self {
        ArithmeticExpression::Constant(Number::new(literal))
    }

    pub fn negate(self) -> Self {
        ArithmeticExpression::Negation(Box::new(self))
    }

    pub fn parenthesise(self) -> Self {
        ArithmeticExpression::Parenthesised(Box::new(self))
    }
}

impl fmt::Display for ArithmeticExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ArithmeticExpression::*;

        match self {
            Constant(n) => write!(f, "{}", n),
            Negation(e) => write!(f, "-{}", e),
            Parenthesised(e) => write!(f, "({})", e),
            Plus(e) => write!(f, "+{}", e),
            Addition(l, r) => write!(f, "{} + {}", l, r),
            Subtraction(l, r) => write!(f, "{} - {}", l, r),
            Multiplication(l, r) => write!(f, "{} * {}", l, r),
            Division(l, r) => write!(f, "{} / {}", l, r),
        }
    }
}

/// Expression plus commodity, e.g. `10.00 USD`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Amount {
    pub expression: ArithmeticExpression,
    pub commodity: Commodity,
}

impl Amount {
    pub fn new(expression: ArithmeticExpression, commodity: impl Into<Commodity>) -> Self {
        Self {
            expression,
            commodity: commodity.into(),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expression, self.commodity)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScalarValue {
    Account(Account),
    Expression(ArithmeticExpression),
    Boolean(bool),
    Commodity(Commodity),
    Date(NaiveDate),
    Link(String),
    Nil,
    String(String),
    Tag(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetadataValue {
    Scalar(ScalarValue),
    Amount(Amount),
}

impl From<ScalarValue> for MetadataValue {
    fn from(value: ScalarValue) -> Self {
        MetadataValue::Scalar(value)
    }
}

impl From<Amount> for MetadataValue {
    fn from(amount: Amount) -> Self {
        MetadataValue::Amount(amount)
    }
}

/// The `a # b` part of a cost: per-unit and total components.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompoundExpression {
    PerUnit(ArithmeticExpression),
    PerUnitAndTotal {
        per_unit: Option<ArithmeticExpression>,
        total: Option<ArithmeticExpression>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CompoundAmount {
    pub expression: Option<CompoundExpression>,
    pub commodity: Option<Commodity>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CostComponent {
    Amount(CompoundAmount),
    Date(NaiveDate),
    Label(String),
}

/// `{...}` or `{{...}}` after a posting's units.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CostSpec {
    pub double_braces: bool,
    pub components: Vec<CostComponent>,
}

/// `@ price` or `@@ total price`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PriceAnnotation {
    pub total: bool,
    pub expression: Option<ArithmeticExpression>,
    pub commodity: Option<Commodity>,
}
