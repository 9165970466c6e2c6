use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pcl")]
#[command(
    version,
    about = "Page Cloner - rebuild live web pages as page-builder templates",
    long_about = "Page Cloner (PCL)\n\nModes:\n- clone: capture a URL at three breakpoints, classify it into sections/columns/widgets, and verify the result's fidelity.\n- capture: capture a URL and print the raw page snapshot.\n- convert: classify a stored snapshot offline.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML or YAML) with browser/capture/classifier/verifier defaults; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

/// Browser knobs shared by every command that loads a live page.
#[derive(Args, Debug, Clone)]
pub struct BrowserArgs {
    #[arg(
        long,
        default_value = "30",
        help = "Navigation timeout (seconds) per wait strategy"
    )]
    pub nav_timeout: u64,

    #[arg(
        long,
        default_value = "45",
        help = "Timeout (seconds) for any other browser helper call"
    )]
    pub process_timeout: u64,

    #[arg(long, default_value = "50", help = "Maximum captured DOM depth")]
    pub max_depth: usize,

    #[arg(
        long,
        default_value = "node",
        value_name = "CMD",
        help = "Node.js command used to run the Playwright helper"
    )]
    pub node_command: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clone a live page into a page-builder template and verify it
    Clone {
        #[arg(long, help = "Absolute http(s) URL of the page to clone")]
        url: String,

        #[arg(long, help = "Return the template without fidelity verification")]
        skip_verification: bool,

        #[arg(
            long,
            default_value = "0.45",
            help = "Fidelity score (0-1) the clone must reach to be accepted"
        )]
        threshold: f64,

        #[arg(
            long,
            value_name = "PATH",
            help = "Also write the template document alone to this file"
        )]
        document_out: Option<PathBuf>,

        #[arg(
            long,
            help = "Directory to store verification screenshots (implies --keep-artifacts); created if missing",
            value_name = "PATH"
        )]
        artifacts_dir: Option<PathBuf>,

        #[arg(
            long,
            help = "Keep verification screenshots; otherwise they are cleaned up"
        )]
        keep_artifacts: bool,

        #[command(flatten)]
        browser: BrowserArgs,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Capture a live page and print its snapshot
    Capture {
        #[arg(long, help = "Absolute http(s) URL of the page to capture")]
        url: String,

        #[command(flatten)]
        browser: BrowserArgs,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Classify a stored snapshot into a template without a browser
    Convert {
        #[arg(long, value_name = "FILE", help = "Snapshot JSON written by `pcl capture`")]
        snapshot: PathBuf,

        #[arg(
            long,
            value_name = "PATH",
            help = "Also write the template document alone to this file"
        )]
        document_out: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, OutputFormat};
    use clap::Parser;

    #[test]
    fn clone_command_uses_defaults() {
        let cli = Cli::parse_from(["pcl", "clone", "--url", "https://example.com"]);

        assert!(!cli.verbose);
        assert!(cli.config.is_none());

        match cli.command {
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
                assert_eq!(url, "https://example.com");
                assert!(!skip_verification);
                assert!((threshold - 0.45).abs() < f64::EPSILON);
                assert!(document_out.is_none());
                assert!(artifacts_dir.is_none());
                assert!(!keep_artifacts);
                assert_eq!(browser.nav_timeout, 30);
                assert_eq!(browser.process_timeout, 45);
                assert_eq!(browser.max_depth, 50);
                assert_eq!(browser.node_command, "node");
                assert!(matches!(format, OutputFormat::Json));
                assert!(output.is_none());
            }
            _ => panic!("expected clone command"),
        }
    }

    #[test]
    fn clone_command_respects_overrides() {
        let cli = Cli::parse_from([
            "pcl",
            "clone",
            "--url",
            "https://example.com",
            "--skip-verification",
            "--threshold",
            "0.7",
            "--document-out",
            "page.json",
            "--artifacts-dir",
            "artifacts",
            "--keep-artifacts",
            "--nav-timeout",
            "20",
            "--process-timeout",
            "60",
            "--max-depth",
            "30",
            "--node-command",
            "/usr/bin/node",
            "--format",
            "pretty",
            "--output",
            "report.json",
            "--config",
            "pcl.toml",
        ]);

        assert_eq!(
            cli.config.as_deref(),
            Some(std::path::Path::new("pcl.toml"))
        );
        match cli.command {
            Commands::Clone {
                skip_verification,
                threshold,
                document_out,
                artifacts_dir,
                keep_artifacts,
                browser,
                format,
                output,
                ..
            } => {
                assert!(skip_verification);
                assert!((threshold - 0.7).abs() < f64::EPSILON);
                assert_eq!(document_out.as_deref(), Some(std::path::Path::new("page.json")));
                assert_eq!(
                    artifacts_dir.as_deref(),
                    Some(std::path::Path::new("artifacts"))
                );
                assert!(keep_artifacts);
                assert_eq!(browser.nav_timeout, 20);
                assert_eq!(browser.process_timeout, 60);
                assert_eq!(browser.max_depth, 30);
                assert_eq!(browser.node_command, "/usr/bin/node");
                assert!(matches!(format, OutputFormat::Pretty));
                assert_eq!(output.as_deref(), Some(std::path::Path::new("report.json")));
            }
            _ => panic!("expected clone command with overrides"),
        }
    }

    #[test]
    fn convert_command_sets_verbose() {
        let cli = Cli::parse_from(["pcl", "--verbose", "convert", "--snapshot", "snap.json"]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Convert {
                snapshot,
                document_out,
                format,
                output,
            } => {
                assert_eq!(snapshot, std::path::PathBuf::from("snap.json"));
                assert!(document_out.is_none());
                assert!(matches!(format, OutputFormat::Json));
                assert!(output.is_none());
            }
            _ => panic!("expected convert command"),
        }
    }
}
