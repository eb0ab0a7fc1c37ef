mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use runlineage_engine::sink::DEFAULT_LINEAGE_URL;
use runlineage_engine::DiscardPolicy;

#[derive(Parser)]
#[command(
    name = "runlineage",
    version,
    about = "Turn orchestrator run logs into OpenLineage events"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Project root
    #[arg(long, default_value = ".", global = true)]
    project_dir: PathBuf,

    #[command(flatten)]
    parse: commands::ParseArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the project's JSON logs and emit lineage for every completed run
    Logparser(LogparserArgs),
    /// Emit lineage for a single log file
    Parsefile {
        /// Log file to parse
        #[arg(short, long)]
        file: PathBuf,
        /// Compiled manifest to resolve plugin config from
        #[arg(short, long)]
        manifest: PathBuf,
    },
}

#[derive(Args)]
struct LogparserArgs {
    /// Environment whose compiled manifest to use (default: from meltano.yml)
    #[arg(short, long)]
    environment: Option<String>,
    /// OpenLineage endpoint
    #[arg(long, default_value = DEFAULT_LINEAGE_URL)]
    url: String,
    /// POST events to the OpenLineage endpoint
    #[arg(long)]
    publish: bool,
    /// Write events to this file, one JSON object per line
    #[arg(short, long)]
    outfile: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let options = cli.parse.resolve()?;
    match cli.command {
        Commands::Logparser(args) => {
            commands::logparser::execute(
                &cli.project_dir,
                args.environment.as_deref(),
                &commands::Output {
                    url: args.url,
                    publish: args.publish,
                    outfile: args.outfile,
                },
                options,
            )
            .await
        }
        Commands::Parsefile { file, manifest } => {
            commands::parsefile::execute(&file, &manifest, options).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parsefile_requires_file_and_manifest() {
        assert!(Cli::try_parse_from(["runlineage", "parsefile", "-f", "meltano.log"]).is_err());
        let cli = Cli::try_parse_from([
            "runlineage",
            "parsefile",
            "-f",
            "meltano.log",
            "-m",
            "manifest.json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Parsefile { .. }));
    }

    #[test]
    fn test_logparser_defaults() {
        let cli = Cli::try_parse_from(["runlineage", "logparser"]).unwrap();
        let Commands::Logparser(args) = cli.command else {
            panic!("expected logparser");
        };
        assert_eq!(args.url, DEFAULT_LINEAGE_URL);
        assert!(!args.publish);
        assert!(args.outfile.is_none());
        assert!(args.environment.is_none());
        assert_eq!(cli.parse.on_unterminated, None);
    }

    #[test]
    fn test_global_parse_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "runlineage",
            "logparser",
            "-e",
            "prod",
            "--publish",
            "--on-unterminated",
            "warn",
            "--random-run-ids",
        ])
        .unwrap();
        assert_eq!(cli.parse.on_unterminated, Some(DiscardPolicy::Warn));
        assert!(cli.parse.random_run_ids);
        assert_eq!(cli.project_dir, PathBuf::from("."));
    }

    #[test]
    fn test_unknown_discard_policy_rejected() {
        assert!(Cli::try_parse_from(["runlineage", "logparser", "--on-unterminated", "loud"]).is_err());
    }
}
