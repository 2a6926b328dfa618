//! Tagging configuration: column bindings, mapping table files, keyword
//! matching options and pipeline policy, loaded from a TOML file.

use crate::engine::keywords::MatchMode;
use crate::engine::{EngineOptions, PipelineStep};
use crate::error::{GpacError, Result};
use crate::mapping::{CountryColumns, TableColumns};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct TaggingConfig {
    pub files: Files,
    #[serde(default)]
    pub columns: Columns,
    #[serde(default)]
    pub keyword_matching: KeywordMatching,
    #[serde(default)]
    pub pipeline: Pipeline,
    #[serde(default)]
    pub tables: Tables,
}

/// Input, output and mapping file locations. Each mapping table is optional;
/// an absent table disables its pipeline step.
#[derive(Debug, Clone, Deserialize)]
pub struct Files {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub client_codes: Option<PathBuf>,
    #[serde(default)]
    pub keywords: Option<PathBuf>,
    #[serde(default)]
    pub attributes: Option<PathBuf>,
    #[serde(default)]
    pub countries: Option<PathBuf>,
}

/// Input-dataset column bindings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Columns {
    #[serde(default)]
    pub client_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// Columns folded into the searchable text; empty means all columns.
    #[serde(default)]
    pub searchable: Vec<String>,
    /// Attribute columns probed in order by the attribute step.
    #[serde(default)]
    pub attribute_fields: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordMatching {
    #[serde(default = "default_threshold")]
    pub frequency_threshold: usize,
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
}

impl Default for KeywordMatching {
    fn default() -> Self {
        Self {
            frequency_threshold: default_threshold(),
            stop_words: Vec::new(),
            match_mode: MatchMode::default(),
        }
    }
}

fn default_threshold() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    #[serde(default = "default_apply_order")]
    pub apply_order: Vec<PipelineStep>,
    #[serde(default)]
    pub country_overlay: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            apply_order: default_apply_order(),
            country_overlay: false,
        }
    }
}

fn default_apply_order() -> Vec<PipelineStep> {
    vec![
        PipelineStep::Keyword,
        PipelineStep::Attribute,
        PipelineStep::Country,
    ]
}

/// Column bindings for each configured mapping table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub client_codes: Option<TableColumns>,
    #[serde(default)]
    pub keywords: Option<TableColumns>,
    #[serde(default)]
    pub attributes: Option<TableColumns>,
    #[serde(default)]
    pub countries: Option<CountryColumns>,
}

impl TaggingConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GpacError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| GpacError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.keyword_matching.frequency_threshold == 0 {
            return Err(GpacError::Config(
                "keyword_matching.frequency_threshold must be at least 1".to_string(),
            ));
        }

        for (i, step) in self.pipeline.apply_order.iter().enumerate() {
            if self.pipeline.apply_order[..i].contains(step) {
                return Err(GpacError::Config(format!(
                    "pipeline.apply_order lists step '{}' more than once",
                    step.as_str()
                )));
            }
        }

        self.validate_table(
            "client_codes",
            self.files.client_codes.is_some(),
            self.tables.client_codes.is_some(),
        )?;
        self.validate_table(
            "keywords",
            self.files.keywords.is_some(),
            self.tables.keywords.is_some(),
        )?;
        self.validate_table(
            "attributes",
            self.files.attributes.is_some(),
            self.tables.attributes.is_some(),
        )?;
        self.validate_table(
            "countries",
            self.files.countries.is_some(),
            self.tables.countries.is_some(),
        )?;

        if self.files.client_codes.is_some() != self.columns.client_code.is_some() {
            return Err(GpacError::Config(
                "a client-code table requires columns.client_code, and vice versa".to_string(),
            ));
        }
        if self.files.countries.is_some() != self.columns.country.is_some() {
            return Err(GpacError::Config(
                "a country table requires columns.country, and vice versa".to_string(),
            ));
        }
        if self.files.attributes.is_some() && self.columns.attribute_fields.is_empty() {
            return Err(GpacError::Config(
                "an attribute table requires at least one entry in columns.attribute_fields"
                    .to_string(),
            ));
        }

        if let Some(countries) = &self.tables.countries {
            if !countries.defines_any_level() {
                return Err(GpacError::Config(
                    "tables.countries must declare at least one level column".to_string(),
                ));
            }
        }

        for step in &self.pipeline.apply_order {
            let configured = match step {
                PipelineStep::Keyword => self.files.keywords.is_some(),
                PipelineStep::Attribute => self.files.attributes.is_some(),
                PipelineStep::Country => self.files.countries.is_some(),
            };
            if !configured {
                return Err(GpacError::Config(format!(
                    "pipeline.apply_order includes '{}' but no {} table is configured",
                    step.as_str(),
                    step.as_str()
                )));
            }
        }

        if self.files.client_codes.is_none()
            && self.files.keywords.is_none()
            && self.files.attributes.is_none()
            && self.files.countries.is_none()
        {
            return Err(GpacError::Config(
                "at least one mapping table must be configured".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_table(&self, name: &str, has_file: bool, has_columns: bool) -> Result<()> {
        if has_file != has_columns {
            return Err(GpacError::Config(format!(
                "mapping table '{}' needs both a [files] entry and a [tables.{}] binding",
                name, name
            )));
        }
        Ok(())
    }

    /// Stop words as a lower-cased set, the form normalization compares
    /// against.
    pub fn stop_words(&self) -> HashSet<String> {
        self.keyword_matching
            .stop_words
            .iter()
            .map(|word| word.trim().to_lowercase())
            .collect()
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            client_code_column: self.columns.client_code.clone(),
            country_column: self.columns.country.clone(),
            searchable_columns: self.columns.searchable.clone(),
            attribute_fields: self.columns.attribute_fields.clone(),
            frequency_threshold: self.keyword_matching.frequency_threshold,
            match_mode: self.keyword_matching.match_mode,
            apply_order: self.pipeline.apply_order.clone(),
            country_overlay: self.pipeline.country_overlay,
        }
    }
}

/// Default config location: `$XDG_CONFIG_HOME/gpactag/gpactag.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let xdg = xdg::BaseDirectories::with_prefix("gpactag").ok()?;
    xdg.find_config_file("gpactag.toml")
}
