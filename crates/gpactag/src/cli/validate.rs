use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use gpactag_lib::{io, Result};
use std::path::PathBuf;

/// Checks the configuration, file paths and mapping tables without touching
/// the input dataset. Structural problems surface here exactly as they would
/// at the start of a tagging run.
pub fn handle_validate_command(config_path: Option<PathBuf>, quiet: bool) -> Result<()> {
    let config = super::load_config(config_path)?;

    io::ensure_input_files_exist(&config, &config.files.input)?;
    if !quiet {
        println!("{} Input file found: {}", style("✓").green(), config.files.input.display());
        for (name, path) in [
            ("client_codes", &config.files.client_codes),
            ("keywords", &config.files.keywords),
            ("attributes", &config.files.attributes),
            ("countries", &config.files.countries),
        ] {
            if let Some(path) = path {
                println!("{} Mapping file found: {} ({})", style("✓").green(), path.display(), name);
            }
        }
    }

    let tables = io::load_mapping_set(&config)?;

    if !quiet {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("Mapping Table").fg(Color::Cyan),
            Cell::new("Entries").fg(Color::Cyan),
        ]);
        if let Some(codes) = &tables.client_codes {
            table.add_row(vec![Cell::new(codes.name()), Cell::new(codes.len())]);
        }
        if let Some(keywords) = &tables.keywords {
            table.add_row(vec![Cell::new(keywords.name()), Cell::new(keywords.len())]);
        }
        if let Some(attributes) = &tables.attributes {
            table.add_row(vec![Cell::new(attributes.name()), Cell::new(attributes.len())]);
        }
        if let Some(countries) = &tables.countries {
            table.add_row(vec![Cell::new(countries.name()), Cell::new(countries.len())]);
        }
        println!("{table}");
        println!("{} Configuration is valid", style("✓").green());
    }

    Ok(())
}
