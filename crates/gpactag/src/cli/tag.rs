use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use gpactag_lib::{
    io, util, ClassificationRun, Result, RuleEngine, Status, Summary,
};
use std::path::PathBuf;

pub fn handle_tag_command(
    config_path: Option<PathBuf>,
    input_override: Option<PathBuf>,
    output_override: Option<PathBuf>,
    summary_path: Option<PathBuf>,
    verbose: bool,
    quiet: bool,
) -> Result<()> {
    let config = super::load_config(config_path)?;

    let input = input_override.unwrap_or_else(|| config.files.input.clone());
    let output = output_override.unwrap_or_else(|| config.files.output.clone());

    io::ensure_input_files_exist(&config, &input)?;

    if !quiet {
        println!(
            "{} Loading mapping tables...",
            style(">>>").cyan()
        );
    }
    let tables = io::load_mapping_set(&config)?;
    let engine = RuleEngine::new(tables, config.engine_options())?;

    let dataset = io::read_dataset(&input)?;
    if !quiet {
        println!(
            "{} Tagging {} records from {}",
            style(">>>").cyan(),
            style(dataset.records.len()).bold(),
            input.display()
        );
    }

    let pb = if verbose || quiet {
        None
    } else {
        Some(util::create_progress_bar(
            dataset.records.len() as u64,
            "Tagging records",
        ))
    };

    let mut run = ClassificationRun::new(&engine);
    for record in dataset.records {
        let classification = run.process(record);

        if let Some(pb) = &pb {
            pb.inc(1);
        }
        if verbose {
            match classification.status {
                Status::Classified => println!(
                    "  {}: {} -> {} / {} / {}",
                    style("✓").green(),
                    classification.matched_rule_id,
                    classification.taxonomy.level1.as_deref().unwrap_or("-"),
                    classification.taxonomy.level2.as_deref().unwrap_or("-"),
                    classification.taxonomy.level3.as_deref().unwrap_or("-"),
                ),
                Status::Unclassified => {
                    println!("  {}: no matching rule", style("·").dim())
                }
            }
        }
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let (results, summary) = run.finish();
    io::write_tagged(&output, &dataset.headers, &results)?;

    if !quiet {
        println!(
            "\n{} Tagged output written to {}",
            style("✓").green(),
            output.display()
        );
        print_summary(&summary);
    }

    if let Some(path) = summary_path {
        export_summary(&path, &input, &output, &summary)?;
        if !quiet {
            println!("{} Summary exported to {}", style("✓").green(), path.display());
        }
    }

    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("\n{}", style("Classification Summary").bold().cyan());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Rule Category").fg(Color::Cyan),
        Cell::new("Records").fg(Color::Cyan),
    ]);
    table.add_row(vec![Cell::new("Client code"), Cell::new(summary.by_client_code)]);
    table.add_row(vec![Cell::new("Keyword"), Cell::new(summary.by_keyword)]);
    table.add_row(vec![Cell::new("Attribute"), Cell::new(summary.by_attribute)]);
    table.add_row(vec![Cell::new("Country"), Cell::new(summary.by_country)]);
    table.add_row(vec![
        Cell::new("Unclassified"),
        Cell::new(summary.unclassified).fg(if summary.unclassified > 0 {
            Color::Yellow
        } else {
            Color::Green
        }),
    ]);
    table.add_row(vec![Cell::new("Total"), Cell::new(summary.total)]);

    println!("{table}");
}

fn export_summary(
    path: &std::path::Path,
    input: &std::path::Path,
    output: &std::path::Path,
    summary: &Summary,
) -> Result<()> {
    let report = serde_json::json!({
        "input": input.display().to_string(),
        "output": output.display().to_string(),
        "summary": summary,
        "generated_at": chrono::Utc::now().to_rfc3339(),
    });

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| gpactag_lib::GpacError::Config(format!("Failed to serialize summary: {e}")))?;
    std::fs::write(path, json_str)?;
    Ok(())
}
