mod cli;

use anyhow::Context;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Commands::Tag {
            config,
            input,
            output,
            summary,
        } => cli::tag::handle_tag_command(config, input, output, summary, cli.verbose, cli.quiet)
            .context("tagging run failed"),

        cli::Commands::Validate { config } => {
            cli::validate::handle_validate_command(config, cli.quiet).context("validation failed")
        }
    }
}
