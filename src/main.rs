mod cli;
mod commands;
mod formatting;
mod pipeline;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_capture, run_clone, run_convert};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

/// Logs go to stderr so stdout stays a clean JSON document.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Clone {
            url,
            skip_verification,
            threshold,
            document_out,
            artifacts_dir,
            keep_artifacts,
            browser,
            format,
            output,
        } => {
            run_clone(
                &raw_args,
                args.config,
                args.verbose,
                url,
                skip_verification,
                threshold,
                document_out,
                artifacts_dir,
                keep_artifacts,
                browser,
                format,
                output,
            )
            .await
        }
        Commands::Capture {
            url,
            browser,
            format,
            output,
        } => {
            run_capture(
                &raw_args,
                args.config,
                args.verbose,
                url,
                browser,
                format,
                output,
            )
            .await
        }
        Commands::Convert {
            snapshot,
            document_out,
            format,
            output,
        } => {
            run_convert(
                args.config,
                args.verbose,
                snapshot,
                document_out,
                format,
                output,
            )
            .await
        }
    }
}
