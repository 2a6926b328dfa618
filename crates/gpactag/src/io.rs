//! CSV adapters: reading the input dataset and mapping files, and writing the
//! tagged output. The engine itself never touches the filesystem; everything
//! here runs before or after the per-record hot path.

use crate::config::TaggingConfig;
use crate::engine::MappingSet;
use crate::error::{GpacError, Result};
use crate::mapping::{CountryTable, KeywordTable, MappingTable};
use crate::record::{ClassifiedRecord, Dataset, Record};
use std::path::{Path, PathBuf};

/// Columns appended to every output row, after the source columns.
pub const OUTPUT_COLUMNS: [&str; 5] = [
    "GPAC_Level1",
    "GPAC_Level2",
    "GPAC_Level3",
    "Matched_Rule_ID",
    "Status",
];

/// Reads a CSV file into headers plus records. Short rows are tolerated and
/// padded with blanks; upstream extracts are frequently ragged.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        return Err(GpacError::FileNotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        if row.len() < headers.len() {
            log::warn!(
                "{}: row {} has {} fields, expected {}; missing values treated as blank",
                path.display(),
                i + 1,
                row.len(),
                headers.len()
            );
        }
        let mut record = Record::new();
        for (j, header) in headers.iter().enumerate() {
            record.push(header, row.get(j).unwrap_or(""));
        }
        records.push(record);
    }

    log::info!("{}: loaded {} records", path.display(), records.len());
    Ok(Dataset { headers, records })
}

/// Checks that the input file and every configured mapping file exist.
/// Output and log locations are deliberately not checked.
pub fn ensure_input_files_exist(config: &TaggingConfig, input: &Path) -> Result<()> {
    let mapping_files = [
        &config.files.client_codes,
        &config.files.keywords,
        &config.files.attributes,
        &config.files.countries,
    ];
    for path in std::iter::once(input).chain(mapping_files.into_iter().flatten().map(PathBuf::as_path))
    {
        if !path.exists() {
            return Err(GpacError::FileNotFound(path.to_path_buf()));
        }
    }
    Ok(())
}

/// Loads every mapping table the configuration names. Fatal on unreadable
/// files or missing columns; runs to completion before any record is
/// processed.
pub fn load_mapping_set(config: &TaggingConfig) -> Result<MappingSet> {
    let mut set = MappingSet::default();

    if let (Some(path), Some(columns)) = (&config.files.client_codes, &config.tables.client_codes) {
        let data = read_dataset(path)?;
        set.client_codes = Some(MappingTable::from_dataset("client_codes", &data, columns)?);
    }
    if let (Some(path), Some(columns)) = (&config.files.keywords, &config.tables.keywords) {
        let data = read_dataset(path)?;
        set.keywords = Some(KeywordTable::from_dataset(
            "keywords",
            &data,
            columns,
            &config.stop_words(),
        )?);
    }
    if let (Some(path), Some(columns)) = (&config.files.attributes, &config.tables.attributes) {
        let data = read_dataset(path)?;
        set.attributes = Some(MappingTable::from_dataset("attributes", &data, columns)?);
    }
    if let (Some(path), Some(columns)) = (&config.files.countries, &config.tables.countries) {
        let data = read_dataset(path)?;
        set.countries = Some(CountryTable::from_dataset("countries", &data, columns)?);
    }

    Ok(set)
}

/// Writes the tagged output: every source column in order, then the five
/// classification columns. Writes to a temporary sibling and renames into
/// place, so an aborted run never leaves a partially-written output file.
pub fn write_tagged(path: &Path, headers: &[String], results: &[ClassifiedRecord]) -> Result<()> {
    let tmp = path.with_extension("tmp");

    {
        let mut writer = csv::Writer::from_path(&tmp)?;

        let mut header_row: Vec<&str> = headers.iter().map(String::as_str).collect();
        header_row.extend(OUTPUT_COLUMNS);
        writer.write_record(&header_row)?;

        for result in results {
            let classification = &result.classification;
            let mut row: Vec<&str> = headers
                .iter()
                .map(|header| result.record.raw(header).unwrap_or(""))
                .collect();
            row.push(classification.taxonomy.level1.as_deref().unwrap_or(""));
            row.push(classification.taxonomy.level2.as_deref().unwrap_or(""));
            row.push(classification.taxonomy.level3.as_deref().unwrap_or(""));
            row.push(classification.matched_rule_id.as_str());
            row.push(classification.status.as_str());
            writer.write_record(&row)?;
        }

        writer.flush()?;
    }

    std::fs::rename(&tmp, path)?;
    log::info!("{}: wrote {} tagged records", path.display(), results.len());
    Ok(())
}
