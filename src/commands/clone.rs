use std::path::PathBuf;
use std::process::ExitCode;

use pcl_lib::output::CloneOutput;
use pcl_lib::{parse_target_url, CloneRequest, CloneService, PclError, PclOutput};

use crate::cli::{BrowserArgs, OutputFormat};
use crate::formatting::{exit_code_for_verdict, render_error, write_output};
use crate::pipeline::{
    build_driver, load_snapshot, mock_snapshot_path, progress_logger, resolve_artifacts_dir,
    shutdown, write_document,
};
use crate::settings::{apply_overrides, format_effective_config, load_config, validate, FlagSources};

/// Run the clone command.
#[allow(clippy::too_many_arguments)]
pub async fn run_clone(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    url: String,
    skip_verification: bool,
    threshold: f64,
    document_out: Option<PathBuf>,
    artifacts_dir: Option<PathBuf>,
    keep_artifacts: bool,
    browser: BrowserArgs,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let mut config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output.clone()),
    };
    apply_overrides(
        &mut config,
        &browser,
        Some(threshold),
        &FlagSources::from_args(raw_args),
    );
    let config = match validate(config, config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output.clone()),
    };
    if verbose {
        eprintln!("{}", format_effective_config(&config, config_path.as_deref()));
    }

    let url = match parse_target_url(&url) {
        Ok(parsed) => parsed.to_string(),
        Err(err) => return render_error(err.into(), format, output.clone()),
    };

    let (artifacts_dir, keep) = resolve_artifacts_dir(artifacts_dir.as_deref(), keep_artifacts);
    let mock = mock_snapshot_path();
    let (driver, manager) = build_driver(&config, mock.is_some());
    let service = CloneService::new(driver, config).with_artifacts(artifacts_dir.clone(), keep);
    let progress = progress_logger(verbose);

    let result = match mock {
        Some(path) => {
            if verbose {
                eprintln!("Replaying snapshot {}\u{2026}", path.display());
            }
            match load_snapshot(&path) {
                Ok(snapshot) => Ok(service
                    .run_snapshot(snapshot, skip_verification, progress)
                    .await),
                Err(err) => Err(err),
            }
        }
        None => {
            let request = CloneRequest::new(url.clone()).skip_verification(skip_verification);
            service.run(request, progress).await
        }
    };
    shutdown(manager).await;

    let result = match result {
        Ok(result) => result,
        Err(err) => return render_error(err, format, output.clone()),
    };

    let mut body = CloneOutput::from_result(url, result);
    if let Some(path) = document_out {
        if let Err(err) = write_document(&body.template, &path) {
            return render_error(err, format, output.clone());
        }
        body.document_path = Some(path);
    }
    body.artifacts_dir = artifacts_dir.filter(|_| keep && body.fidelity.is_some());

    let exit = exit_code_for_verdict(&body.verdict);
    if let Err(err) = write_output(&PclOutput::Clone(body), format, output.clone()) {
        return render_error(PclError::Config(err.to_string()), format, output);
    }
    exit
}
