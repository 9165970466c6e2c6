use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pcl_lib::{ErrorOutput, PclError, PclOutput, Verdict, PCL_OUTPUT_VERSION};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &PclOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: PclError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let error_payload = err.to_payload();
    let payload = PclOutput::Error(ErrorOutput {
        version: PCL_OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    // Reserve exit code 2 for fatal/errors; needs-review verdicts use 1.
    ExitCode::from(2)
}

/// Write JSON output to file or stdout.
fn write_json_output(body: &PclOutput, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &PclOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &PclOutput, colorize: bool) -> String {
    let format_score = |score: f64, threshold: Option<f64>| {
        let text = format!("{:.3} ({:.1}%)", score, score * 100.0);
        let code = match threshold {
            Some(th) if score >= th => "32",
            Some(th) if (th - score) <= 0.05 => "33",
            Some(_) => "31",
            None => score_color_code(score),
        };
        color(&text, code, colorize)
    };

    match body {
        PclOutput::Clone(out) => {
            let mut buf = String::new();
            let (status, code) = match &out.verdict {
                Verdict::Accepted => ("ACCEPTED", "32"),
                Verdict::Skipped => ("SKIPPED", "36"),
                Verdict::NeedsReview { .. } => ("NEEDS REVIEW", "31"),
            };
            writeln!(buf, "{} Page clone of {}", color(status, code, colorize), out.url).ok();
            writeln!(
                buf,
                "Layout: {} sections, {} columns, {} widgets",
                out.counts.sections, out.counts.columns, out.counts.widgets
            )
            .ok();

            if let Some(report) = &out.fidelity {
                let threshold = report.details.threshold;
                writeln!(
                    buf,
                    "Fidelity: {} (threshold {:.1}%)",
                    format_score(report.fidelity_score, Some(threshold)),
                    threshold * 100.0
                )
                .ok();
                writeln!(buf, "Scores:").ok();
                for (name, score) in [
                    ("structural", report.structural_score),
                    ("visual", report.visual_score),
                    ("responsive", report.responsive_score),
                ] {
                    writeln!(buf, "- {:12} {}", name, format_score(score, None)).ok();
                }
                if let Some(fallback) = &report.details.fallback {
                    writeln!(buf, "Fallback: {}", fallback.reason).ok();
                }
            }

            if let Verdict::NeedsReview { reason, retry } = &out.verdict {
                writeln!(buf, "Reason: {reason}").ok();
                if retry.skip_verification {
                    writeln!(buf, "Hint: re-run, or pass --skip-verification to accept as-is").ok();
                }
            }
            if out.governance.triggered() {
                writeln!(
                    buf,
                    "Size governance: {} fields cleaned, {} sections dropped ({} -> {} bytes)",
                    out.governance.cleaned_fields,
                    out.governance.truncated_sections,
                    out.governance.original_bytes,
                    out.governance.final_bytes
                )
                .ok();
            }
            if let Some(path) = &out.document_path {
                writeln!(buf, "Document: {}", path.display()).ok();
            }
            if let Some(dir) = &out.artifacts_dir {
                writeln!(buf, "Artifacts: {}", dir.display()).ok();
            }
            if !out.warnings.is_empty() {
                writeln!(buf, "Warnings (max 5):").ok();
                for warning in out.warnings.iter().take(5) {
                    writeln!(buf, "- {warning}").ok();
                }
            }
            buf
        }
        PclOutput::Capture(out) => {
            let mut buf = String::new();
            let header = color("[CAPTURE]", "36", colorize);
            writeln!(buf, "{} {}", header, out.snapshot.url).ok();
            if !out.snapshot.metadata.title.is_empty() {
                writeln!(buf, "Title: {}", out.snapshot.metadata.title).ok();
            }
            for capture in &out.snapshot.captures {
                writeln!(
                    buf,
                    "- {:8} {}px, {} elements",
                    capture.breakpoint,
                    capture.viewport_width,
                    capture.root.count()
                )
                .ok();
            }
            writeln!(buf, "Assets: {}", out.snapshot.assets.total()).ok();
            buf
        }
        PclOutput::Convert(out) => {
            let mut buf = String::new();
            let header = color("[CONVERT]", "34", colorize);
            writeln!(buf, "{} {}", header, out.source.display()).ok();
            writeln!(
                buf,
                "Layout: {} sections, {} columns, {} widgets",
                out.counts.sections, out.counts.columns, out.counts.widgets
            )
            .ok();
            if let Some(path) = &out.document_path {
                writeln!(buf, "Document: {}", path.display()).ok();
            }
            buf
        }
        PclOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Map score to ANSI color code.
fn score_color_code(score: f64) -> &'static str {
    if score >= 0.75 {
        "32" // green
    } else if score >= 0.45 {
        "33" // yellow
    } else {
        "31" // red
    }
}

/// Exit code for a clone verdict: only needs-review is non-zero.
pub fn exit_code_for_verdict(verdict: &Verdict) -> ExitCode {
    if verdict.needs_review() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcl_lib::classify::GovernanceReport;
    use pcl_lib::output::CloneOutput;
    use pcl_lib::types::{
        DocumentMetadata, LayoutCounts, PageSettings, TemplateDocument, TEMPLATE_VERSION,
    };
    use pcl_lib::RetryAdvice;

    fn template() -> TemplateDocument {
        TemplateDocument {
            version: TEMPLATE_VERSION.to_string(),
            title: "Example".to_string(),
            doc_type: "page".to_string(),
            content: vec![],
            page_settings: PageSettings {
                template: "elementor_canvas".to_string(),
                viewport_mobile: 375,
                viewport_tablet: 768,
                custom_css: String::new(),
                custom_colors: vec![],
                custom_fonts: vec![],
            },
            metadata: DocumentMetadata {
                created_at: String::new(),
                source_url: "https://example.com/".to_string(),
                fidelity_score: None,
                total_elements: 0,
                sections_count: 0,
                columns_count: 0,
                widgets_count: 0,
            },
        }
    }

    fn clone_output(verdict: Verdict) -> PclOutput {
        PclOutput::Clone(CloneOutput {
            version: PCL_OUTPUT_VERSION.to_string(),
            url: "https://example.com/".to_string(),
            verdict,
            counts: LayoutCounts {
                sections: 2,
                columns: 3,
                widgets: 7,
            },
            template: template(),
            fidelity: None,
            governance: GovernanceReport::default(),
            document_path: Some(PathBuf::from("/tmp/page.json")),
            artifacts_dir: None,
            warnings: vec!["stylesheet blocked".to_string()],
        })
    }

    #[test]
    fn exit_code_maps_verdicts() {
        assert_eq!(exit_code_for_verdict(&Verdict::Accepted), ExitCode::SUCCESS);
        assert_eq!(exit_code_for_verdict(&Verdict::Skipped), ExitCode::SUCCESS);
        let review = Verdict::NeedsReview {
            reason: "low".to_string(),
            retry: RetryAdvice {
                retryable: true,
                skip_verification: true,
            },
        };
        assert_eq!(exit_code_for_verdict(&review), ExitCode::from(1));
    }

    #[test]
    fn render_error_always_returns_fatal_exit_code() {
        let code = render_error(
            PclError::Config("boom".to_string()),
            OutputFormat::Json,
            None,
        );
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn format_pretty_summarizes_a_clone() {
        let pretty = format_pretty(&clone_output(Verdict::Skipped), false);
        assert!(pretty.contains("SKIPPED Page clone of https://example.com/"));
        assert!(pretty.contains("2 sections, 3 columns, 7 widgets"));
        assert!(pretty.contains("Document: /tmp/page.json"));
        assert!(pretty.contains("- stylesheet blocked"));
    }

    #[test]
    fn format_pretty_explains_needs_review() {
        let verdict = Verdict::NeedsReview {
            reason: "fidelity score 0.21 is below the threshold 0.45".to_string(),
            retry: RetryAdvice {
                retryable: true,
                skip_verification: true,
            },
        };
        let pretty = format_pretty(&clone_output(verdict), false);
        assert!(pretty.contains("NEEDS REVIEW"));
        assert!(pretty.contains("Reason: fidelity score 0.21"));
        assert!(pretty.contains("--skip-verification"));
    }

    #[test]
    fn format_pretty_handles_errors() {
        let output = PclOutput::Error(ErrorOutput {
            version: PCL_OUTPUT_VERSION.to_string(),
            message: Some("bad input".to_string()),
            error: pcl_lib::ErrorPayload {
                category: pcl_lib::ErrorCategory::Config,
                message: "bad input".to_string(),
                remediation: Some("check flags".to_string()),
            },
        });

        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("[ERROR] bad input"));
        assert!(pretty.contains("Hint: check flags"));
    }
}
