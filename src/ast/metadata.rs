use super::journal::Comment;
use super::values::{MetadataValue, ScalarValue};

/// `key: value` line under a directive or posting. A key may carry no value.
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataItem {
    pub key: String,
    pub value: Option<MetadataValue>,
}

impl MetadataItem {
    pub fn new(key: impl Into<String>, value: Option<MetadataValue>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Shorthand for an item holding a string value.
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            key,
            Some(MetadataValue::Scalar(ScalarValue::String(value.into()))),
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetadataLine {
    Item(MetadataItem),
    Tag(String),
    Link(String),
    Comment(Comment),
}

impl From<MetadataItem> for MetadataLine {
    fn from(item: MetadataItem) -> Self {
        MetadataLine::Item(item)
    }
}

/// Ordered metadata block. Line order is kept as written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    lines: Vec<MetadataLine>,
}

impl Metadata {
    pub fn new(lines: Vec<MetadataLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[MetadataLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &MetadataItem> {
        self.lines.iter().filter_map(|line| match line {
            MetadataLine::Item(item) => Some(item),
            _ => None,
        })
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// First item stored under `key`.
    pub fn get(&self, key: &str) -> Option<&MetadataItem> {
        self.items().find(|item| item.key == key)
    }

    pub fn with_lines_at_start(&self, lines: impl IntoIterator<Item = MetadataLine>) -> Metadata {
        let mut merged: Vec<MetadataLine> = lines.into_iter().collect();
        merged.extend(self.lines.iter().cloned());
        Metadata::new(merged)
    }

    pub fn with_lines_at_end(&self, lines: impl IntoIterator<Item = MetadataLine>) -> Metadata {
        let mut merged = self.lines.clone();
        merged.extend(lines);
        Metadata::new(merged)
    }
}

impl From<Vec<MetadataLine>> for Metadata {
    fn from(lines: Vec<MetadataLine>) -> Self {
        Metadata::new(lines)
    }
}

impl FromIterator<MetadataLine> for Metadata {
    fn from_iter<I: IntoIterator<Item = MetadataLine>>(iter: I) -> Self {
        Metadata::new(iter.into_iter().collect())
    }
}
