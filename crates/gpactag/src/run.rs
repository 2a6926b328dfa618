//! Drives the engine over a whole dataset and accumulates the run summary.

use crate::engine::RuleEngine;
use crate::record::{Classification, ClassifiedRecord, MatchSource, Record, Status};
use serde::Serialize;

/// Per-category match counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub by_client_code: usize,
    pub by_keyword: usize,
    pub by_attribute: usize,
    pub by_country: usize,
    pub unclassified: usize,
}

impl Summary {
    pub fn record(&mut self, classification: &Classification) {
        self.total += 1;
        match classification.source {
            Some(MatchSource::ClientCode) => self.by_client_code += 1,
            Some(MatchSource::Keyword) => self.by_keyword += 1,
            Some(MatchSource::Attribute) => self.by_attribute += 1,
            Some(MatchSource::Country) => self.by_country += 1,
            None => self.unclassified += 1,
        }
    }

    pub fn classified(&self) -> usize {
        self.total - self.unclassified
    }
}

/// Incremental run state. Records are processed independently and in input
/// order; the output order matches the input order exactly, since downstream
/// consumers rely on positional correspondence with the source file.
pub struct ClassificationRun<'a> {
    engine: &'a RuleEngine,
    results: Vec<ClassifiedRecord>,
    summary: Summary,
}

impl<'a> ClassificationRun<'a> {
    pub fn new(engine: &'a RuleEngine) -> Self {
        Self {
            engine,
            results: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// Classifies one record and appends it to the run. A failure while
    /// evaluating the record's rules is logged with its position and the
    /// record is kept as unclassified; it never aborts the run.
    pub fn process(&mut self, record: Record) -> &Classification {
        let position = self.results.len();
        let classification = match self.engine.classify(&record) {
            Ok(classification) => classification,
            Err(e) => {
                log::error!("Row {}: rule evaluation failed ({}), marked unclassified", position, e);
                Classification::unclassified()
            }
        };

        match classification.status {
            Status::Classified => log::debug!(
                "Row {}: classified by {}",
                position,
                classification.matched_rule_id
            ),
            Status::Unclassified => log::debug!("Row {}: no rule matched", position),
        }

        self.summary.record(&classification);
        self.results.push(ClassifiedRecord {
            record,
            classification,
        });
        &self.results[position].classification
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn finish(self) -> (Vec<ClassifiedRecord>, Summary) {
        log::info!(
            "Run complete: {} records, {} classified, {} unclassified",
            self.summary.total,
            self.summary.classified(),
            self.summary.unclassified
        );
        (self.results, self.summary)
    }
}

/// Classifies every record in one call. Convenience wrapper over
/// [`ClassificationRun`] for callers that do not need per-record progress.
pub fn run_classification(
    records: Vec<Record>,
    engine: &RuleEngine,
) -> (Vec<ClassifiedRecord>, Summary) {
    let mut run = ClassificationRun::new(engine);
    for record in records {
        run.process(record);
    }
    run.finish()
}
