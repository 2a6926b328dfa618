//! The ordered classification pipeline.
//!
//! Each record is pushed through a fixed priority order: direct client-code
//! lookup first, then the configured `apply_order` of keyword, attribute and
//! country steps. The first successful step wins; the country step is a
//! partial fallback that writes only the levels its entry defines. A record
//! no step matches comes back unclassified.

pub mod keywords;

use crate::error::{GpacError, Result};
use crate::mapping::{CountryEntry, CountryTable, KeywordTable, MappingTable};
use crate::record::{Classification, MatchSource, Record};
use self::keywords::MatchMode;
use serde::{Deserialize, Serialize};

/// The secondary pipeline steps that can be reordered via configuration.
/// Direct client-code lookup always runs first and is not part of this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStep {
    Keyword,
    Attribute,
    Country,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Keyword => "keyword",
            PipelineStep::Attribute => "attribute",
            PipelineStep::Country => "country",
        }
    }
}

/// Engine behavior knobs. All of this arrives from the configuration file;
/// the engine itself reads no ambient state.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub client_code_column: Option<String>,
    pub country_column: Option<String>,
    /// Columns concatenated into the searchable text; empty means all.
    pub searchable_columns: Vec<String>,
    /// Attribute columns probed in order by the attribute step.
    pub attribute_fields: Vec<String>,
    /// Minimum distinct matched phrases for a keyword rule to fire.
    pub frequency_threshold: usize,
    pub match_mode: MatchMode,
    pub apply_order: Vec<PipelineStep>,
    /// When true, a country entry fills levels left unset by a partial
    /// keyword or attribute match. It never overwrites a set level.
    pub country_overlay: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            client_code_column: None,
            country_column: None,
            searchable_columns: Vec::new(),
            attribute_fields: Vec::new(),
            frequency_threshold: 1,
            match_mode: MatchMode::default(),
            apply_order: vec![
                PipelineStep::Keyword,
                PipelineStep::Attribute,
                PipelineStep::Country,
            ],
            country_overlay: false,
        }
    }
}

/// The mapping tables a run consults. Any table may be absent; its step then
/// simply never matches.
#[derive(Debug, Default)]
pub struct MappingSet {
    pub client_codes: Option<MappingTable>,
    pub keywords: Option<KeywordTable>,
    pub attributes: Option<MappingTable>,
    pub countries: Option<CountryTable>,
}

pub struct RuleEngine {
    tables: MappingSet,
    options: EngineOptions,
}

impl RuleEngine {
    pub fn new(tables: MappingSet, options: EngineOptions) -> Result<Self> {
        if options.frequency_threshold == 0 {
            return Err(GpacError::Config(
                "frequency_threshold must be at least 1".to_string(),
            ));
        }
        for (i, step) in options.apply_order.iter().enumerate() {
            if options.apply_order[..i].contains(step) {
                return Err(GpacError::Config(format!(
                    "apply_order lists step '{}' more than once",
                    step.as_str()
                )));
            }
        }
        Ok(Self { tables, options })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Classifies one record. Pure: depends only on the record and the
    /// immutable tables, so records may be evaluated concurrently. A record
    /// missing a lookup column is a non-match, never an error.
    pub fn classify(&self, record: &Record) -> Result<Classification> {
        if let Some(classification) = self.match_client_code(record) {
            return Ok(classification);
        }

        for (i, step) in self.options.apply_order.iter().enumerate() {
            let hit = match step {
                PipelineStep::Keyword => self.match_keywords(record),
                PipelineStep::Attribute => self.match_attributes(record),
                PipelineStep::Country => self.match_country(record),
            };
            if let Some(mut classification) = hit {
                if self.options.country_overlay
                    && *step != PipelineStep::Country
                    && !classification.taxonomy.is_complete()
                    && self.options.apply_order[i + 1..].contains(&PipelineStep::Country)
                {
                    if let Some(entry) = self.lookup_country(record) {
                        classification.taxonomy.merge_missing(&entry.taxonomy);
                        log::debug!(
                            "Country '{}' filled unset levels after rule {}",
                            entry.country,
                            classification.matched_rule_id
                        );
                    }
                }
                return Ok(classification);
            }
        }

        Ok(Classification::unclassified())
    }

    fn match_client_code(&self, record: &Record) -> Option<Classification> {
        let column = self.options.client_code_column.as_deref()?;
        let table = self.tables.client_codes.as_ref()?;
        let code = record.get(column)?;
        let entry = table.lookup(code)?;
        Some(Classification::matched(
            MatchSource::ClientCode,
            format!("ClientCode:{code}"),
            entry.taxonomy.clone(),
        ))
    }

    fn match_keywords(&self, record: &Record) -> Option<Classification> {
        let table = self.tables.keywords.as_ref()?;
        let haystack = record.searchable_text(&self.options.searchable_columns);
        for rule in table.rules() {
            if keywords::is_match(
                &rule.phrases,
                &haystack,
                self.options.match_mode,
                self.options.frequency_threshold,
            ) {
                return Some(Classification::matched(
                    MatchSource::Keyword,
                    rule.id(),
                    rule.taxonomy.clone(),
                ));
            }
        }
        None
    }

    fn match_attributes(&self, record: &Record) -> Option<Classification> {
        let table = self.tables.attributes.as_ref()?;
        for field in &self.options.attribute_fields {
            let Some(value) = record.get(field) else {
                continue;
            };
            if let Some(entry) = table.lookup(value) {
                return Some(Classification::matched(
                    MatchSource::Attribute,
                    format!("Attribute:{field}"),
                    entry.taxonomy.clone(),
                ));
            }
        }
        None
    }

    fn match_country(&self, record: &Record) -> Option<Classification> {
        let entry = self.lookup_country(record)?;
        Some(Classification::matched(
            MatchSource::Country,
            format!("Country:{}", entry.country),
            entry.taxonomy.clone(),
        ))
    }

    fn lookup_country(&self, record: &Record) -> Option<&CountryEntry> {
        let column = self.options.country_column.as_deref()?;
        let table = self.tables.countries.as_ref()?;
        table.lookup(record.get(column)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{CountryColumns, TableColumns};
    use crate::record::{Dataset, Status, Taxonomy, UNMATCHED_RULE_ID};
    use std::collections::HashSet;

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

    fn level_columns(key: &str, rule_id: Option<&str>) -> TableColumns {
        TableColumns {
            key: key.to_string(),
            level1: "Level1".to_string(),
            level2: "Level2".to_string(),
            level3: "Level3".to_string(),
            rule_id: rule_id.map(str::to_string),
        }
    }

    fn client_code_table() -> MappingTable {
        let data = dataset(
            &["Code", "Level1", "Level2", "Level3"],
            &[&["EQ-1", "Equity", "Common", "Listed"]],
        );
        MappingTable::from_dataset("client_codes", &data, &level_columns("Code", None)).unwrap()
    }

    fn keyword_table() -> KeywordTable {
        let data = dataset(
            &["Keywords", "Level1", "Level2", "Level3", "Rule_ID"],
            &[
                &["corporate bond", "Fixed Income", "Bond", "Corporate", "KW-1"],
                &["equity, swap", "Derivatives", "Swap", "Equity", "KW-2"],
            ],
        );
        KeywordTable::from_dataset(
            "keywords",
            &data,
            &level_columns("Keywords", Some("Rule_ID")),
            &HashSet::new(),
        )
        .unwrap()
    }

    fn attribute_table() -> MappingTable {
        let data = dataset(
            &["Attribute", "Level1", "Level2", "Level3"],
            &[&["WARRANT", "Equity", "Derivative", "Warrant"]],
        );
        MappingTable::from_dataset("attributes", &data, &level_columns("Attribute", None)).unwrap()
    }

    fn country_table() -> CountryTable {
        let data = dataset(
            &["Country", "Level2", "Level3"],
            &[&["Japan", "Developed Markets", "APAC"]],
        );
        let columns = CountryColumns {
            key: "Country".to_string(),
            level1: None,
            level2: Some("Level2".to_string()),
            level3: Some("Level3".to_string()),
        };
        CountryTable::from_dataset("countries", &data, &columns).unwrap()
    }

    fn options() -> EngineOptions {
        EngineOptions {
            client_code_column: Some("CLIENT_CODE".to_string()),
            country_column: Some("COUNTRY".to_string()),
            attribute_fields: vec!["SECURITY_TYPE".to_string()],
            ..EngineOptions::default()
        }
    }

    fn full_engine(options: EngineOptions) -> RuleEngine {
        RuleEngine::new(
            MappingSet {
                client_codes: Some(client_code_table()),
                keywords: Some(keyword_table()),
                attributes: Some(attribute_table()),
                countries: Some(country_table()),
            },
            options,
        )
        .unwrap()
    }

    #[test]
    fn client_code_takes_precedence_over_keywords() {
        let engine = full_engine(options());
        let record = Record::from_pairs(&[
            ("CLIENT_CODE", "EQ-1"),
            ("DESCRIPTION", "corporate bond desk"),
        ]);

        let result = engine.classify(&record).unwrap();
        assert_eq!(result.source, Some(MatchSource::ClientCode));
        assert_eq!(result.matched_rule_id, "ClientCode:EQ-1");
        assert_eq!(result.taxonomy.level1.as_deref(), Some("Equity"));
    }

    #[test]
    fn first_keyword_rule_meeting_threshold_wins() {
        let engine = full_engine(options());
        let record = Record::from_pairs(&[
            ("CLIENT_CODE", "UNKNOWN"),
            ("DESCRIPTION", "Corporate Bond with embedded swap"),
        ]);

        let result = engine.classify(&record).unwrap();
        assert_eq!(result.source, Some(MatchSource::Keyword));
        assert_eq!(result.matched_rule_id, "KW-1");
    }

    #[test]
    fn keyword_threshold_is_respected() {
        let mut opts = options();
        opts.frequency_threshold = 2;
        let engine = full_engine(opts);

        // One phrase of KW-2 is not enough at threshold 2.
        let one = Record::from_pairs(&[("DESCRIPTION", "plain equity position")]);
        let result = engine.classify(&one).unwrap();
        assert_ne!(result.source, Some(MatchSource::Keyword));

        let two = Record::from_pairs(&[("DESCRIPTION", "equity total return swap")]);
        let result = engine.classify(&two).unwrap();
        assert_eq!(result.matched_rule_id, "KW-2");
    }

    #[test]
    fn attribute_step_probes_fields_in_order() {
        let mut opts = options();
        opts.attribute_fields = vec!["INSTRUMENT_TYPE".to_string(), "SECURITY_TYPE".to_string()];
        let engine = full_engine(opts);

        let record = Record::from_pairs(&[("SECURITY_TYPE", "WARRANT"), ("DESCRIPTION", "misc")]);
        let result = engine.classify(&record).unwrap();

        assert_eq!(result.source, Some(MatchSource::Attribute));
        assert_eq!(result.matched_rule_id, "Attribute:SECURITY_TYPE");
        assert_eq!(result.taxonomy.level3.as_deref(), Some("Warrant"));
    }

    #[test]
    fn country_fires_only_when_nothing_else_matched() {
        let engine = full_engine(options());

        let keyword_and_country = Record::from_pairs(&[
            ("DESCRIPTION", "corporate bond"),
            ("COUNTRY", "Japan"),
        ]);
        let result = engine.classify(&keyword_and_country).unwrap();
        assert_eq!(result.source, Some(MatchSource::Keyword));

        let country_only = Record::from_pairs(&[
            ("CLIENT_CODE", "UNKNOWN"),
            ("DESCRIPTION", "unmapped instrument"),
            ("COUNTRY", "Japan"),
        ]);
        let result = engine.classify(&country_only).unwrap();
        assert_eq!(result.source, Some(MatchSource::Country));
        assert_eq!(result.matched_rule_id, "Country:Japan");
        assert!(result.taxonomy.level1.is_none());
        assert_eq!(result.taxonomy.level2.as_deref(), Some("Developed Markets"));
    }

    #[test]
    fn country_overlay_fills_only_unset_levels() {
        let data = dataset(
            &["Keywords", "Level1", "Level2", "Level3", "Rule_ID"],
            &[&["sukuk", "Fixed Income", "", "", "KW-9"]],
        );
        let partial_keywords = KeywordTable::from_dataset(
            "keywords",
            &data,
            &level_columns("Keywords", Some("Rule_ID")),
            &HashSet::new(),
        )
        .unwrap();

        let mut opts = options();
        opts.country_overlay = true;
        let engine = RuleEngine::new(
            MappingSet {
                client_codes: None,
                keywords: Some(partial_keywords),
                attributes: None,
                countries: Some(country_table()),
            },
            opts,
        )
        .unwrap();

        let record = Record::from_pairs(&[("DESCRIPTION", "sovereign sukuk"), ("COUNTRY", "Japan")]);
        let result = engine.classify(&record).unwrap();

        assert_eq!(result.source, Some(MatchSource::Keyword));
        assert_eq!(result.matched_rule_id, "KW-9");
        assert_eq!(result.taxonomy.level1.as_deref(), Some("Fixed Income"));
        assert_eq!(result.taxonomy.level2.as_deref(), Some("Developed Markets"));
        assert_eq!(result.taxonomy.level3.as_deref(), Some("APAC"));
    }

    #[test]
    fn overlay_disabled_leaves_partial_match_untouched() {
        let data = dataset(
            &["Keywords", "Level1", "Level2", "Level3", "Rule_ID"],
            &[&["sukuk", "Fixed Income", "", "", "KW-9"]],
        );
        let partial_keywords = KeywordTable::from_dataset(
            "keywords",
            &data,
            &level_columns("Keywords", Some("Rule_ID")),
            &HashSet::new(),
        )
        .unwrap();

        let engine = RuleEngine::new(
            MappingSet {
                keywords: Some(partial_keywords),
                countries: Some(country_table()),
                ..MappingSet::default()
            },
            options(),
        )
        .unwrap();

        let record = Record::from_pairs(&[("DESCRIPTION", "sovereign sukuk"), ("COUNTRY", "Japan")]);
        let result = engine.classify(&record).unwrap();

        assert_eq!(result.matched_rule_id, "KW-9");
        assert!(result.taxonomy.level2.is_none());
    }

    #[test]
    fn apply_order_is_honored() {
        let mut opts = options();
        opts.apply_order = vec![PipelineStep::Attribute, PipelineStep::Keyword];
        let engine = full_engine(opts);

        // Matches both a keyword rule and an attribute rule; attribute is
        // configured to run first.
        let record = Record::from_pairs(&[
            ("SECURITY_TYPE", "WARRANT"),
            ("DESCRIPTION", "corporate bond warrant"),
        ]);
        let result = engine.classify(&record).unwrap();
        assert_eq!(result.source, Some(MatchSource::Attribute));
    }

    #[test]
    fn unmatched_record_is_unclassified() {
        let engine = full_engine(options());
        let record = Record::from_pairs(&[("DESCRIPTION", "nothing to see here")]);

        let result = engine.classify(&record).unwrap();
        assert_eq!(result.status, Status::Unclassified);
        assert_eq!(result.matched_rule_id, UNMATCHED_RULE_ID);
        assert_eq!(result.taxonomy, Taxonomy::default());
    }

    #[test]
    fn missing_tables_are_skipped() {
        let engine = RuleEngine::new(MappingSet::default(), options()).unwrap();
        let record = Record::from_pairs(&[("CLIENT_CODE", "EQ-1"), ("COUNTRY", "Japan")]);

        let result = engine.classify(&record).unwrap();
        assert_eq!(result.status, Status::Unclassified);
    }

    #[test]
    fn rejects_zero_threshold_and_duplicate_steps() {
        let mut opts = EngineOptions::default();
        opts.frequency_threshold = 0;
        assert!(RuleEngine::new(MappingSet::default(), opts).is_err());

        let mut opts = EngineOptions::default();
        opts.apply_order = vec![PipelineStep::Keyword, PipelineStep::Keyword];
        assert!(RuleEngine::new(MappingSet::default(), opts).is_err());
    }
}
