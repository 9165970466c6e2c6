use std::path::PathBuf;
use std::process::ExitCode;

use pcl_lib::output::{CaptureOutput, PCL_OUTPUT_VERSION};
use pcl_lib::{NavigationPolicy, PclError, PclOutput, SnapshotCapturer};

use crate::cli::{BrowserArgs, OutputFormat};
use crate::formatting::{render_error, write_output};
use crate::pipeline::{build_driver, load_snapshot, mock_snapshot_path, shutdown};
use crate::settings::{apply_overrides, format_effective_config, load_config, validate, FlagSources};

/// Run the capture command.
pub async fn run_capture(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    url: String,
    browser: BrowserArgs,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let mut config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output.clone()),
    };
    apply_overrides(&mut config, &browser, None, &FlagSources::from_args(raw_args));
    let config = match validate(config, config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output.clone()),
    };
    if verbose {
        eprintln!("{}", format_effective_config(&config, config_path.as_deref()));
    }

    let snapshot = match mock_snapshot_path() {
        Some(path) => load_snapshot(&path),
        None => {
            let (driver, manager) = build_driver(&config, false);
            let capturer = SnapshotCapturer::new(
                driver,
                config.capture.clone(),
                NavigationPolicy::from_config(&config.browser, &config.capture),
            );
            if verbose {
                eprintln!("Capturing {url}\u{2026}");
            }
            let snapshot = capturer.capture(&url).await;
            shutdown(manager).await;
            snapshot
        }
    };
    let snapshot = match snapshot {
        Ok(snapshot) => snapshot,
        Err(err) => return render_error(err, format, output.clone()),
    };

    let body = PclOutput::Capture(CaptureOutput {
        version: PCL_OUTPUT_VERSION.to_string(),
        snapshot,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(PclError::Config(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}
