use std::path::PathBuf;

use clap::Parser;
use mdpipe_model::JobId;
use mdpipe_observe::{LoggerConfig, LoggerFormat};

use crate::catalog::Selection;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "mdpipe",
    version,
    about = "Run a catalog of independent analysis jobs on a bounded worker pool"
)]
pub struct Cli {
    /// Job catalog (TOML).
    #[arg(long, short = 'c', default_value = "mdpipe.toml")]
    pub catalog: PathBuf,

    /// Cap on concurrent jobs; never above 8 or the number of cores.
    #[arg(long, short = 'j', value_name = "N")]
    pub workers: Option<usize>,

    /// Write the JSON summary here instead of the catalog's `summary_path`.
    #[arg(long, value_name = "PATH", conflicts_with = "no_summary")]
    pub summary: Option<PathBuf>,

    /// Do not write the JSON summary.
    #[arg(long)]
    pub no_summary: bool,

    /// Run only this job; repeatable.
    #[arg(long, value_name = "ID")]
    pub only: Vec<String>,

    /// Skip this job; repeatable, adds to the catalog's `exclude`.
    #[arg(long, value_name = "ID")]
    pub exclude: Vec<String>,

    /// Bytes of stderr kept as a failed job's error excerpt.
    #[arg(long, value_name = "N")]
    pub excerpt_bytes: Option<usize>,

    /// Log filter, e.g. `info` or `info,mdpipe.exec=trace`.
    #[arg(long, default_value = "info", value_name = "FILTER")]
    pub log_level: String,

    #[arg(long, default_value = "text", value_name = "text|json|journald")]
    pub log_format: LoggerFormat,

    /// Write Prometheus metrics in text format here after the batch.
    #[arg(long, value_name = "PATH")]
    pub metrics_out: Option<PathBuf>,

    /// Print the selected jobs and exit without running them.
    #[arg(long)]
    pub list: bool,
}

impl Cli {
    pub fn selection(&self) -> Selection {
        Selection {
            only: self.only.iter().map(|s| JobId::from(s.trim())).collect(),
            exclude: self.exclude.iter().map(|s| JobId::from(s.trim())).collect(),
        }
    }

    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig::default()
            .with_level(self.log_level.clone())
            .with_format(self.log_format)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["mdpipe"]).unwrap();
        assert_eq!(cli.catalog, PathBuf::from("mdpipe.toml"));
        assert_eq!(cli.log_format, LoggerFormat::Text);
        assert_eq!(cli.log_level, "info");
        assert!(cli.workers.is_none());
        assert!(!cli.list);
    }

    #[test]
    fn repeated_selection_flags() {
        let cli = Cli::try_parse_from([
            "mdpipe", "--only", "01", "--only", "3", "--exclude", "16", "-j", "2",
        ])
        .unwrap();
        let sel = cli.selection();
        assert_eq!(sel.only, vec![JobId::from("01"), JobId::from("3")]);
        assert_eq!(sel.exclude, vec![JobId::from("16")]);
        assert_eq!(cli.workers, Some(2));
    }

    #[test]
    fn summary_flags_conflict() {
        assert!(Cli::try_parse_from(["mdpipe", "--summary", "x.json", "--no-summary"]).is_err());
    }

    #[test]
    fn log_format_is_validated() {
        let cli = Cli::try_parse_from(["mdpipe", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LoggerFormat::Json);
        assert!(Cli::try_parse_from(["mdpipe", "--log-format", "xml"]).is_err());
    }
}
