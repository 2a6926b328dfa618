pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod mapping;
pub mod record;
pub mod run;
pub mod util;

pub use config::TaggingConfig;
pub use engine::keywords::MatchMode;
pub use engine::{EngineOptions, MappingSet, PipelineStep, RuleEngine};
pub use error::{GpacError, Result};
pub use mapping::{
    CountryColumns, CountryEntry, CountryTable, KeywordRule, KeywordTable, MappingEntry,
    MappingTable, TableColumns,
};
pub use record::{
    Classification, ClassifiedRecord, Dataset, MatchSource, Record, Status, Taxonomy,
    UNMATCHED_RULE_ID,
};
pub use run::{run_classification, ClassificationRun, Summary};
