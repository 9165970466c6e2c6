use std::path::PathBuf;
use std::process::ExitCode;

use pcl_lib::output::{ConvertOutput, PCL_OUTPUT_VERSION};
use pcl_lib::{govern, PclError, PclOutput, TemplateBuilder};

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::pipeline::{load_snapshot, write_document};
use crate::settings::load_config;

/// Run the convert command.
pub async fn run_convert(
    config_path: Option<PathBuf>,
    verbose: bool,
    snapshot_path: PathBuf,
    document_out: Option<PathBuf>,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output.clone()),
    };
    let snapshot = match load_snapshot(&snapshot_path) {
        Ok(snapshot) => snapshot,
        Err(err) => return render_error(err, format, output.clone()),
    };
    if verbose {
        eprintln!(
            "Classifying {} ({} breakpoints)\u{2026}",
            snapshot.url,
            snapshot.captures.len()
        );
    }

    let mut template =
        TemplateBuilder::new(config.classifier.clone(), config.capture.breakpoints).build(&snapshot);
    let governance = govern(&mut template, &config.governance);

    let document_path = match document_out {
        Some(path) => match write_document(&template, &path) {
            Ok(()) => Some(path),
            Err(err) => return render_error(err, format, output.clone()),
        },
        None => None,
    };

    let body = PclOutput::Convert(ConvertOutput {
        version: PCL_OUTPUT_VERSION.to_string(),
        source: snapshot_path,
        counts: template.counts(),
        template,
        governance,
        document_path,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(PclError::Config(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}
