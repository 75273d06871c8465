use anyhow::Result;
use clap::Parser;
use dgaguard_cli::{commands, Cli, Commands};
use serde_json::json;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}", json!({ "error": format!("{:#}", e) }));
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every domain was classified
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Classify(args) => {
            let stdin = std::io::stdin();
            let failures = commands::classify(
                &args,
                stdin.lock(),
                std::io::stdout().lock(),
                std::io::stderr().lock(),
            )?;
            Ok(failures == 0)
        }
        Commands::Inspect { artifact } => {
            commands::inspect(&artifact, std::io::stdout().lock())?;
            Ok(true)
        }
        Commands::Features {
            schema_version,
            domain,
        } => {
            commands::features(&domain, schema_version, std::io::stdout().lock())?;
            Ok(true)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "dgaguard_cli=debug,dgaguard_classifiers=debug"
    } else {
        "dgaguard_cli=info,dgaguard_classifiers=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
