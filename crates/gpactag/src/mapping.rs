//! Mapping tables: the read-only lookup structures the rule pipeline consults.
//!
//! Each table is built once from a parsed CSV [`Dataset`] plus a column
//! binding naming the key column and the taxonomy level columns. Exact-match
//! tables are indexed by key; keyword tables pre-normalize their phrase specs
//! and precompile one pattern per phrase; country tables hold a partial
//! taxonomy per country.

use crate::engine::keywords::{self, MatchMode, Phrase};
use crate::error::{GpacError, Result};
use crate::record::{Dataset, Record, Taxonomy};
use serde::Deserialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// Column binding for an exact-match or keyword mapping table: the key column
/// (a code, attribute value, or comma-separated keyword spec), exactly three
/// taxonomy level columns, and an optional rule-id column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableColumns {
    pub key: String,
    pub level1: String,
    pub level2: String,
    pub level3: String,
    #[serde(default)]
    pub rule_id: Option<String>,
}

/// Column binding for a country table. Only declared level columns are ever
/// written by a country match; country mappings typically define levels 2-3
/// and leave level 1 to the upstream rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CountryColumns {
    pub key: String,
    #[serde(default)]
    pub level1: Option<String>,
    #[serde(default)]
    pub level2: Option<String>,
    #[serde(default)]
    pub level3: Option<String>,
}

impl CountryColumns {
    pub fn defines_any_level(&self) -> bool {
        self.level1.is_some() || self.level2.is_some() || self.level3.is_some()
    }
}

fn require_column(table: &str, headers: &[String], column: &str) -> Result<()> {
    if headers.iter().any(|h| h == column) {
        Ok(())
    } else {
        Err(GpacError::MalformedMapping {
            table: table.to_string(),
            column: column.to_string(),
        })
    }
}

/// One row of an exact-match mapping table.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    pub key: String,
    pub taxonomy: Taxonomy,
    pub rule_id: Option<String>,
}

/// Exact-match lookup table. Duplicate keys keep the first entry in source
/// order; duplicates are a data-quality condition, not an error.
#[derive(Debug, Clone)]
pub struct MappingTable {
    name: String,
    entries: Vec<MappingEntry>,
    index: HashMap<String, usize>,
}

impl MappingTable {
    pub fn from_dataset(name: &str, data: &Dataset, columns: &TableColumns) -> Result<Self> {
        for column in [&columns.key, &columns.level1, &columns.level2, &columns.level3] {
            require_column(name, &data.headers, column)?;
        }
        if let Some(rule_id) = &columns.rule_id {
            require_column(name, &data.headers, rule_id)?;
        }

        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for record in &data.records {
            let Some(key) = record.get(&columns.key) else {
                continue;
            };
            match index.entry(key.to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(entries.len());
                }
                Entry::Occupied(_) => {
                    log::warn!(
                        "Mapping table '{}': duplicate key '{}', keeping first entry",
                        name,
                        key
                    );
                }
            }
            entries.push(entry_from_record(record, key, columns));
        }

        log::info!("Mapping table '{}' loaded with {} entries", name, entries.len());
        Ok(Self {
            name: name.to_string(),
            entries,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact, case-sensitive key lookup. First entry wins on duplicates.
    pub fn lookup(&self, key: &str) -> Option<&MappingEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Scans entry keys in source order and returns the first whose key
    /// occurs in any of the record's values. "Keyword appears anywhere in
    /// the row" semantics; `mode` decides substring vs whole-word boundaries.
    pub fn lookup_by_value_presence(&self, record: &Record, mode: MatchMode) -> Option<&MappingEntry> {
        for entry in &self.entries {
            let phrase = match Phrase::compile(&entry.key) {
                Ok(phrase) => phrase,
                Err(e) => {
                    log::warn!("Mapping table '{}': skipping key: {}", self.name, e);
                    continue;
                }
            };
            if record.values().any(|value| phrase.occurs_in(value, mode)) {
                return Some(entry);
            }
        }
        None
    }
}

fn entry_from_record(record: &Record, key: &str, columns: &TableColumns) -> MappingEntry {
    MappingEntry {
        key: key.to_string(),
        taxonomy: Taxonomy::new(
            record.get(&columns.level1),
            record.get(&columns.level2),
            record.get(&columns.level3),
        ),
        rule_id: columns
            .rule_id
            .as_ref()
            .and_then(|column| record.get(column))
            .map(str::to_string),
    }
}

/// One keyword rule: the raw spec, its pre-normalized phrases, and the
/// taxonomy it assigns.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub spec: String,
    pub phrases: Vec<Phrase>,
    pub taxonomy: Taxonomy,
    pub rule_id: Option<String>,
}

impl KeywordRule {
    /// Audit identifier: the mapping's Rule_ID when present, otherwise
    /// derived from the spec.
    pub fn id(&self) -> String {
        self.rule_id
            .clone()
            .unwrap_or_else(|| format!("Keyword:{}", self.spec))
    }
}

/// Keyword rules in source order. Rule order is significant: the first rule
/// meeting the frequency threshold wins.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    name: String,
    rules: Vec<KeywordRule>,
}

impl KeywordTable {
    pub fn from_dataset(
        name: &str,
        data: &Dataset,
        columns: &TableColumns,
        stop_words: &HashSet<String>,
    ) -> Result<Self> {
        for column in [&columns.key, &columns.level1, &columns.level2, &columns.level3] {
            require_column(name, &data.headers, column)?;
        }
        if let Some(rule_id) = &columns.rule_id {
            require_column(name, &data.headers, rule_id)?;
        }

        let mut rules = Vec::new();
        for record in &data.records {
            let Some(spec) = record.get(&columns.key) else {
                continue;
            };
            let phrases = keywords::normalize_keywords(spec, stop_words)
                .iter()
                .map(|text| Phrase::compile(text))
                .collect::<Result<Vec<_>>>()?;
            rules.push(KeywordRule {
                spec: spec.to_string(),
                phrases,
                taxonomy: Taxonomy::new(
                    record.get(&columns.level1),
                    record.get(&columns.level2),
                    record.get(&columns.level3),
                ),
                rule_id: columns
                    .rule_id
                    .as_ref()
                    .and_then(|column| record.get(column))
                    .map(str::to_string),
            });
        }

        log::info!("Keyword table '{}' loaded with {} rules", name, rules.len());
        Ok(Self {
            name: name.to_string(),
            rules,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// One country rule: a partial taxonomy override.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryEntry {
    pub country: String,
    pub taxonomy: Taxonomy,
}

#[derive(Debug, Clone)]
pub struct CountryTable {
    name: String,
    entries: Vec<CountryEntry>,
    index: HashMap<String, usize>,
}

impl CountryTable {
    pub fn from_dataset(name: &str, data: &Dataset, columns: &CountryColumns) -> Result<Self> {
        require_column(name, &data.headers, &columns.key)?;
        for column in [&columns.level1, &columns.level2, &columns.level3]
            .into_iter()
            .flatten()
        {
            require_column(name, &data.headers, column)?;
        }

        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for record in &data.records {
            let Some(country) = record.get(&columns.key) else {
                continue;
            };
            match index.entry(country.to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(entries.len());
                }
                Entry::Occupied(_) => {
                    log::warn!(
                        "Country table '{}': duplicate country '{}', keeping first entry",
                        name,
                        country
                    );
                }
            }
            let level = |column: &Option<String>| {
                column.as_ref().and_then(|c| record.get(c)).map(str::to_string)
            };
            entries.push(CountryEntry {
                country: country.to_string(),
                taxonomy: Taxonomy {
                    level1: level(&columns.level1),
                    level2: level(&columns.level2),
                    level3: level(&columns.level3),
                },
            });
        }

        log::info!("Country table '{}' loaded with {} entries", name, entries.len());
        Ok(Self {
            name: name.to_string(),
            entries,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, country: &str) -> Option<&CountryEntry> {
        self.index.get(country).map(|&i| &self.entries[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn dataset(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let records = rows
            .iter()
            .map(|row| {
                let mut record = Record::new();
                for (i, header) in headers.iter().enumerate() {
                    record.push(header, row.get(i).copied().unwrap_or(""));
                }
                record
            })
            .collect();
        Dataset { headers, records }
    }

    fn code_columns() -> TableColumns {
        TableColumns {
            key: "Client_Product_Code".to_string(),
            level1: "GPAC_Product_Level1".to_string(),
            level2: "GPAC_Product_Level2".to_string(),
            level3: "GPAC_Product_Level3".to_string(),
            rule_id: None,
        }
    }

    #[test]
    fn missing_required_column_fails_construction() {
        let data = dataset(
            &["Client_Product_Code", "GPAC_Product_Level1", "GPAC_Product_Level2"],
            &[],
        );

        let err = MappingTable::from_dataset("client_codes", &data, &code_columns()).unwrap_err();
        match err {
            GpacError::MalformedMapping { table, column } => {
                assert_eq!(table, "client_codes");
                assert_eq!(column, "GPAC_Product_Level3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let data = dataset(
            &[
                "Client_Product_Code",
                "GPAC_Product_Level1",
                "GPAC_Product_Level2",
                "GPAC_Product_Level3",
            ],
            &[&["EQ-1", "Equity", "Common", "Listed"]],
        );
        let table = MappingTable::from_dataset("client_codes", &data, &code_columns()).unwrap();

        let entry = table.lookup("EQ-1").unwrap();
        assert_eq!(entry.taxonomy.level1.as_deref(), Some("Equity"));

        assert!(table.lookup("eq-1").is_none());
        assert!(table.lookup("EQ-10").is_none());
    }

    #[test]
    fn duplicate_keys_keep_first_entry() {
        let data = dataset(
            &[
                "Client_Product_Code",
                "GPAC_Product_Level1",
                "GPAC_Product_Level2",
                "GPAC_Product_Level3",
            ],
            &[
                &["EQ-1", "Equity", "Common", "Listed"],
                &["EQ-1", "Fixed Income", "Bond", "Corporate"],
            ],
        );
        let table = MappingTable::from_dataset("client_codes", &data, &code_columns()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("EQ-1").unwrap().taxonomy.level1.as_deref(), Some("Equity"));
    }

    #[test]
    fn value_presence_lookup_respects_match_mode() {
        let data = dataset(
            &[
                "Client_Product_Code",
                "GPAC_Product_Level1",
                "GPAC_Product_Level2",
                "GPAC_Product_Level3",
            ],
            &[&["WARRANT", "Equity", "Derivative", "Warrant"]],
        );
        let table = MappingTable::from_dataset("client_codes", &data, &code_columns()).unwrap();

        let record = Record::from_pairs(&[("DESC", "COVERED WARRANTS DESK")]);
        assert!(table
            .lookup_by_value_presence(&record, MatchMode::Substring)
            .is_some());
        assert!(table
            .lookup_by_value_presence(&record, MatchMode::WholeWord)
            .is_none());

        let exact = Record::from_pairs(&[("DESC", "LISTED WARRANT HK")]);
        assert!(table
            .lookup_by_value_presence(&exact, MatchMode::WholeWord)
            .is_some());
    }

    #[test]
    fn keyword_table_normalizes_specs_at_build() {
        let data = dataset(
            &[
                "Keywords_Matched",
                "GPAC_Product_Level1",
                "GPAC_Product_Level2",
                "GPAC_Product_Level3",
                "Rule_ID",
            ],
            &[&["Equity Swap, AND, Total Return", "Derivatives", "Swap", "Equity", "R-7"]],
        );
        let columns = TableColumns {
            key: "Keywords_Matched".to_string(),
            level1: "GPAC_Product_Level1".to_string(),
            level2: "GPAC_Product_Level2".to_string(),
            level3: "GPAC_Product_Level3".to_string(),
            rule_id: Some("Rule_ID".to_string()),
        };
        let stops: HashSet<String> = ["and".to_string()].into_iter().collect();

        let table = KeywordTable::from_dataset("keywords", &data, &columns, &stops).unwrap();
        let rule = &table.rules()[0];

        assert_eq!(rule.id(), "R-7");
        let texts: Vec<&str> = rule.phrases.iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["equity swap", "total return"]);
    }

    #[test]
    fn country_table_applies_only_declared_levels() {
        let data = dataset(
            &["Country", "Asset_Class_Level2", "Asset_Class_Level3"],
            &[&["Japan", "Developed Markets", "APAC"]],
        );
        let columns = CountryColumns {
            key: "Country".to_string(),
            level1: None,
            level2: Some("Asset_Class_Level2".to_string()),
            level3: Some("Asset_Class_Level3".to_string()),
        };

        let table = CountryTable::from_dataset("countries", &data, &columns).unwrap();
        let entry = table.lookup("Japan").unwrap();

        assert!(entry.taxonomy.level1.is_none());
        assert_eq!(entry.taxonomy.level2.as_deref(), Some("Developed Markets"));
        assert_eq!(entry.taxonomy.level3.as_deref(), Some("APAC"));
        assert!(table.lookup("japan").is_none());
    }
}
