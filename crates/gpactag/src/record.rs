//! Input rows and classification output types.
//!
//! A [`Record`] is an ordered column -> value mapping with a free-form schema;
//! the engine only interprets the columns named in its configuration and folds
//! everything else into the searchable text. Classification output is carried
//! alongside the untouched source row in [`ClassifiedRecord`].

use serde::{Deserialize, Serialize};

/// One input row. Column order is preserved from the source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut record = Self::new();
        for (column, value) in pairs {
            record.push(column, value);
        }
        record
    }

    pub fn push(&mut self, column: &str, value: &str) {
        self.fields.push((column.to_string(), value.to_string()));
    }

    /// Returns the value for `column`, treating blank cells as absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    /// Returns the stored value for `column` even when blank.
    pub fn raw(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds the lower-cased haystack for phrase matching from the selected
    /// columns. An empty selection means every column participates.
    pub fn searchable_text(&self, columns: &[String]) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if columns.is_empty() {
            parts.extend(self.values().filter(|v| !v.trim().is_empty()));
        } else {
            for column in columns {
                if let Some(value) = self.get(column) {
                    parts.push(value);
                }
            }
        }
        parts.join(" ").to_lowercase()
    }
}

/// A parsed tabular file: the header row plus one [`Record`] per data row.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

/// The three-level GPAC classification. Levels may be individually unset;
/// country rules in particular define only a subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub level1: Option<String>,
    pub level2: Option<String>,
    pub level3: Option<String>,
}

impl Taxonomy {
    pub fn new(level1: Option<&str>, level2: Option<&str>, level3: Option<&str>) -> Self {
        Self {
            level1: level1.map(str::to_string),
            level2: level2.map(str::to_string),
            level3: level3.map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.level1.is_none() && self.level2.is_none() && self.level3.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.level1.is_some() && self.level2.is_some() && self.level3.is_some()
    }

    /// Fills levels that are still unset from `other`, leaving set levels
    /// untouched. Partial-override semantics of the country fallback.
    pub fn merge_missing(&mut self, other: &Taxonomy) {
        if self.level1.is_none() {
            self.level1 = other.level1.clone();
        }
        if self.level2.is_none() {
            self.level2 = other.level2.clone();
        }
        if self.level3.is_none() {
            self.level3 = other.level3.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Classified,
    Unclassified,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Classified => "classified",
            Status::Unclassified => "unclassified",
        }
    }
}

/// Which pipeline step produced a match, for audit and summary counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    ClientCode,
    Keyword,
    Attribute,
    Country,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::ClientCode => "client_code",
            MatchSource::Keyword => "keyword",
            MatchSource::Attribute => "attribute",
            MatchSource::Country => "country",
        }
    }
}

/// Rule id emitted when no pipeline step matched.
pub const UNMATCHED_RULE_ID: &str = "none";

/// The terminal outcome for one record. Produced once, never mutated after.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub taxonomy: Taxonomy,
    pub matched_rule_id: String,
    pub status: Status,
    pub source: Option<MatchSource>,
}

impl Classification {
    pub fn matched(source: MatchSource, rule_id: String, taxonomy: Taxonomy) -> Self {
        Self {
            taxonomy,
            matched_rule_id: rule_id,
            status: Status::Classified,
            source: Some(source),
        }
    }

    pub fn unclassified() -> Self {
        Self {
            taxonomy: Taxonomy::default(),
            matched_rule_id: UNMATCHED_RULE_ID.to_string(),
            status: Status::Unclassified,
            source: None,
        }
    }
}

/// A source row paired with its classification outcome.
#[derive(Debug, Clone)]
pub struct ClassifiedRecord {
    pub record: Record,
    pub classification: Classification,
}
