//! TOML job catalog.
//!
//! ```toml
//! base_dir = "/store/sim"
//! codes_dir = "analysis/codes"
//! summary_path = "analysis/ANALYSIS_RESULTS_SUMMARY.json"
//! interpreter = "python3"
//! exclude = [4, 16]
//!
//! [[jobs]]
//! id = 1
//! description = "Thermodynamic Analysis"
//! script = "01_thermodynamic_analysis.py"
//! ```
//!
//! Relative `base_dir` is taken from the catalog file's directory; every other
//! relative path is taken from `base_dir`, which is also the working directory
//! of each job.
use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use mdpipe_core::CoreError;
use mdpipe_exec::{ExecConfig, RlimitConfig};
use mdpipe_model::{DEFAULT_EXCERPT_BYTES, DEFAULT_TIMEOUT_SECS, Job, JobId, JobTarget};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cannot read catalog {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("job {0}: exactly one of `script` or `program` must be set")]
    Target(JobId),
    #[error("unknown job id: {0}")]
    UnknownJob(JobId),
    #[error("`max_workers` must be at least 1")]
    ZeroWorkers,
    #[error(transparent)]
    Registry(#[from] CoreError),
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_excerpt_bytes() -> usize {
    DEFAULT_EXCERPT_BYTES
}

fn default_kill_grace_ms() -> u64 {
    5_000
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Directory of job scripts, relative to `base_dir`.
    #[serde(default)]
    pub codes_dir: Option<PathBuf>,
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default = "default_excerpt_bytes")]
    pub excerpt_bytes: usize,
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Jobs kept in the catalog but never run; each must name a catalog job.
    #[serde(default)]
    pub exclude: Vec<JobId>,
    /// Extra environment for every job.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub jobs: Vec<JobEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobEntry {
    pub id: JobId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub script: Option<PathBuf>,
    #[serde(default)]
    pub program: Option<PathBuf>,
    /// Overrides the catalog interpreter for this script.
    #[serde(default)]
    pub interpreter: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// `[limits]` table; mirrors [`RlimitConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Limits {
    pub max_open_files: Option<u64>,
    pub max_file_size_bytes: Option<u64>,
    pub max_address_space_bytes: Option<u64>,
    pub max_cpu_secs: Option<u64>,
    #[serde(default)]
    pub disable_core_dumps: bool,
}

impl From<&Limits> for RlimitConfig {
    fn from(l: &Limits) -> Self {
        RlimitConfig {
            max_open_files: l.max_open_files,
            max_file_size_bytes: l.max_file_size_bytes,
            max_address_space_bytes: l.max_address_space_bytes,
            max_cpu_secs: l.max_cpu_secs,
            disable_core_dumps: l.disable_core_dumps,
        }
    }
}

/// Which catalog jobs a run covers.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Run only these; empty means all.
    pub only: Vec<JobId>,
    /// Skipped in addition to the catalog's own `exclude`.
    pub exclude: Vec<JobId>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut catalog = Self::from_toml_str(&text).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if catalog.base_dir.is_relative() {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            if let Some(dir) = dir {
                catalog.base_dir = dir.join(&catalog.base_dir);
            }
        }
        Ok(catalog)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Summary location, anchored at `base_dir`.
    pub fn summary_path(&self) -> Option<PathBuf> {
        self.summary_path.as_ref().map(|p| self.base_dir.join(p))
    }

    pub fn exec_config(&self) -> ExecConfig {
        ExecConfig {
            working_dir: self.base_dir.clone(),
            env: self.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            excerpt_bytes: self.excerpt_bytes,
            kill_grace: Duration::from_millis(self.kill_grace_ms),
            rlimits: RlimitConfig::from(&self.limits),
        }
    }

    /// Jobs selected for a run, in catalog order.
    pub fn jobs(&self, selection: &Selection) -> Result<Vec<Job>, CatalogError> {
        let known: HashSet<&JobId> = self.jobs.iter().map(|j| &j.id).collect();
        if let Some(id) = self
            .exclude
            .iter()
            .chain(&selection.only)
            .chain(&selection.exclude)
            .find(|id| !known.contains(id))
        {
            return Err(CatalogError::UnknownJob(id.clone()));
        }

        let skipped: HashSet<&JobId> = self.exclude.iter().chain(&selection.exclude).collect();
        let only: HashSet<&JobId> = selection.only.iter().collect();

        self.jobs
            .iter()
            .filter(|e| !skipped.contains(&e.id))
            .filter(|e| only.is_empty() || only.contains(&e.id))
            .map(|e| self.job(e))
            .collect()
    }

    fn job(&self, entry: &JobEntry) -> Result<Job, CatalogError> {
        let target = match (&entry.script, &entry.program) {
            (Some(script), None) => {
                let script = match &self.codes_dir {
                    Some(dir) => dir.join(script),
                    None => script.clone(),
                };
                let interpreter = entry.interpreter.as_ref().unwrap_or(&self.interpreter);
                JobTarget::script(interpreter.as_str(), script)
            }
            (None, Some(program)) => JobTarget::program(program.clone()),
            _ => return Err(CatalogError::Target(entry.id.clone())),
        };

        let timeout = entry.timeout_secs.unwrap_or(self.default_timeout_secs);
        Ok(Job::new(entry.id.clone(), entry.description.clone(), target.with_args(&entry.args))
            .with_timeout_secs(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
        base_dir = "/store/sim"
        codes_dir = "analysis/codes"
        summary_path = "analysis/ANALYSIS_RESULTS_SUMMARY.json"
        max_workers = 4
        exclude = ["04"]

        [env]
        OMP_NUM_THREADS = "1"

        [limits]
        max_cpu_secs = 7200

        [[jobs]]
        id = 1
        description = "Thermodynamic Analysis"
        script = "01_thermodynamic_analysis.py"

        [[jobs]]
        id = "04"
        description = "CUDA Analysis"
        script = "04_cuda.py"

        [[jobs]]
        id = 5
        description = "Render"
        program = "/usr/bin/vmd"
        args = ["-dispdev", "none"]
        timeout_secs = 60
    "#;

    fn ids(jobs: &[Job]) -> Vec<&str> {
        jobs.iter().map(|j| j.id.as_str()).collect()
    }

    #[test]
    fn parses_defaults_and_targets() {
        let catalog = Catalog::from_toml_str(CATALOG).unwrap();
        assert_eq!(catalog.interpreter, "python3");
        assert_eq!(catalog.excerpt_bytes, DEFAULT_EXCERPT_BYTES);
        assert_eq!(catalog.max_workers, Some(4));

        let jobs = catalog.jobs(&Selection::default()).unwrap();
        assert_eq!(ids(&jobs), ["1", "5"]);

        assert_eq!(
            jobs[0].target,
            JobTarget::script("python3", "analysis/codes/01_thermodynamic_analysis.py")
        );
        assert_eq!(jobs[0].timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(
            jobs[1].target,
            JobTarget::program("/usr/bin/vmd").with_args(["-dispdev", "none"])
        );
        assert_eq!(jobs[1].timeout_secs, 60);
    }

    #[test]
    fn exec_config_follows_catalog() {
        let catalog = Catalog::from_toml_str(CATALOG).unwrap();
        let cfg = catalog.exec_config();
        assert_eq!(cfg.working_dir, PathBuf::from("/store/sim"));
        assert_eq!(cfg.env, vec![("OMP_NUM_THREADS".to_string(), "1".to_string())]);
        assert_eq!(cfg.rlimits.max_cpu_secs, Some(7200));
        assert_eq!(cfg.kill_grace, Duration::from_secs(5));
        assert_eq!(
            catalog.summary_path(),
            Some(PathBuf::from("/store/sim/analysis/ANALYSIS_RESULTS_SUMMARY.json"))
        );
    }

    #[test]
    fn selection_filters_jobs() {
        let catalog = Catalog::from_toml_str(CATALOG).unwrap();

        let only = Selection {
            only: vec![JobId::from("5")],
            ..Default::default()
        };
        assert_eq!(ids(&catalog.jobs(&only).unwrap()), ["5"]);

        let skip = Selection {
            exclude: vec![JobId::from("1")],
            ..Default::default()
        };
        assert_eq!(ids(&catalog.jobs(&skip).unwrap()), ["5"]);
    }

    #[test]
    fn unknown_selection_id_is_rejected() {
        let catalog = Catalog::from_toml_str(CATALOG).unwrap();
        let sel = Selection {
            only: vec![JobId::from("99")],
            ..Default::default()
        };
        assert!(matches!(
            catalog.jobs(&sel),
            Err(CatalogError::UnknownJob(id)) if id.as_str() == "99"
        ));
    }

    #[test]
    fn catalog_exclude_must_name_a_job() {
        let catalog = Catalog::from_toml_str(
            r#"
            exclude = ["04", "16"]

            [[jobs]]
            id = 4
            program = "/bin/true"
        "#,
        )
        .unwrap();
        assert!(matches!(
            catalog.jobs(&Selection::default()),
            Err(CatalogError::UnknownJob(id)) if id.as_str() == "04"
        ));
    }

    #[test]
    fn integer_exclude_matches_integer_id() {
        let catalog = Catalog::from_toml_str(
            r#"
            exclude = [4]

            [[jobs]]
            id = 4
            program = "/bin/true"

            [[jobs]]
            id = 5
            program = "/bin/true"
        "#,
        )
        .unwrap();
        assert_eq!(ids(&catalog.jobs(&Selection::default()).unwrap()), ["5"]);
    }

    #[test]
    fn job_needs_exactly_one_target() {
        let both = r#"
            [[jobs]]
            id = 1
            script = "a.py"
            program = "/bin/true"
        "#;
        let catalog = Catalog::from_toml_str(both).unwrap();
        assert!(matches!(
            catalog.jobs(&Selection::default()),
            Err(CatalogError::Target(_))
        ));

        let neither = "[[jobs]]\nid = 2\n";
        let catalog = Catalog::from_toml_str(neither).unwrap();
        assert!(matches!(
            catalog.jobs(&Selection::default()),
            Err(CatalogError::Target(_))
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Catalog::from_toml_str("max_worker = 3").is_err());
        assert!(Catalog::from_toml_str("[[jobs]]\nid = -1\nprogram = \"x\"").is_err());
    }

    #[test]
    fn empty_catalog_has_no_jobs() {
        let catalog = Catalog::from_toml_str("").unwrap();
        assert!(catalog.jobs(&Selection::default()).unwrap().is_empty());
        assert_eq!(catalog.base_dir, PathBuf::from("."));
        assert!(catalog.summary_path().is_none());
    }

    #[test]
    fn relative_base_dir_follows_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdpipe.toml");
        fs::write(&path, "base_dir = \"sim\"\n").unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.base_dir, dir.path().join("sim"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Catalog::load(Path::new("/nonexistent/mdpipe.toml")).unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }
}
