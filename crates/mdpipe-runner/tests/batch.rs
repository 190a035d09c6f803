#![cfg(unix)]

use std::{fs, path::Path, time::Duration};

use clap::Parser;
use mdpipe_model::{JobId, JobStatus};
use mdpipe_runner::{Cli, Plan, execute};
use serde_json::Value;

fn plan(catalog: &Path, extra: &[&str]) -> Plan {
    let mut args = vec!["mdpipe", "--catalog", catalog.to_str().unwrap()];
    args.extend_from_slice(extra);
    Plan::from_cli(&Cli::try_parse_from(args).unwrap()).unwrap()
}

fn write_catalog(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("mdpipe.toml");
    fs::write(&path, body).unwrap();
    path
}

#[tokio::test(flavor = "multi_thread")]
async fn success_failure_and_timeout_under_two_workers() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = write_catalog(
        dir.path(),
        r#"
        summary_path = "results/summary.json"
        max_workers = 2
        kill_grace_ms = 200

        [[jobs]]
        id = "A"
        description = "sleeps then succeeds"
        program = "sh"
        args = ["-c", "sleep 1"]

        [[jobs]]
        id = "B"
        description = "sleeps then fails"
        program = "sh"
        args = ["-c", "sleep 1; echo 'RuntimeError: no frames' >&2; exit 2"]

        [[jobs]]
        id = "C"
        description = "never finishes"
        program = "sh"
        args = ["-c", "sleep 30"]
        timeout_secs = 2
        "#,
    );

    let plan = plan(&catalog, &[]);
    let mut out = Vec::new();
    let summary = execute(&plan, std::io::sink(), &mut out).await.unwrap();

    assert_eq!(summary.total_jobs(), 3);
    assert_eq!(summary.success_count(), 1);
    assert_eq!(summary.failed_count(), 2);

    let status = |id: &str| summary.get(&JobId::from(id)).unwrap().result.status;
    assert_eq!(status("A"), JobStatus::Success);
    assert_eq!(status("B"), JobStatus::Failed);
    assert_eq!(status("C"), JobStatus::TimedOut);

    let total = summary.total_elapsed();
    assert!(
        total >= Duration::from_millis(3900) && total < Duration::from_secs(6),
        "aggregate elapsed {total:?}"
    );

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(&format!("Max Workers: {}", plan.pool.workers())));
    assert!(text.contains("EXECUTION SUMMARY"));
    assert!(text.contains("└─ Error: RuntimeError: no frames"));

    let json: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("results/summary.json")).unwrap())
            .unwrap();
    assert_eq!(json["total_modules"], 3);
    assert_eq!(json["successful"], 1);
    assert_eq!(json["failed"], 2);
    assert_eq!(json["modules"]["A"]["status"], "SUCCESS");
    assert_eq!(json["modules"]["B"]["status"], "FAILED");
    assert_eq!(json["modules"]["B"]["error"], "RuntimeError: no frames");
    assert_eq!(json["modules"]["C"]["status"], "TIMEOUT");
    assert_eq!(json["modules"]["C"]["time_seconds"], 2.0);
    assert_eq!(json["modules"]["C"]["error"], "execution timeout (>2s)");
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_catalog_reports_zeros() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = write_catalog(dir.path(), "summary_path = \"summary.json\"\n");

    let plan = plan(&catalog, &[]);
    let summary = execute(&plan, std::io::sink(), &mut Vec::new()).await.unwrap();

    assert_eq!(summary.total_jobs(), 0);
    assert!(summary.all_succeeded());

    let json: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap()).unwrap();
    assert_eq!(json["total_modules"], 0);
    assert_eq!(json["successful"], 0);
    assert_eq!(json["failed"], 0);
    assert!(json["modules"].as_object().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn scripts_resolve_from_codes_dir_and_missing_ones_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("codes")).unwrap();
    fs::write(dir.path().join("codes/01_ok.sh"), "test -d codes\n").unwrap();

    let catalog = write_catalog(
        dir.path(),
        r#"
        codes_dir = "codes"
        interpreter = "sh"

        [[jobs]]
        id = 1
        description = "present"
        script = "01_ok.sh"

        [[jobs]]
        id = 2
        description = "absent"
        script = "02_missing.sh"
        "#,
    );

    let plan = plan(&catalog, &["--no-summary"]);
    let summary = execute(&plan, std::io::sink(), &mut Vec::new()).await.unwrap();

    let one = &summary.get(&JobId::from("1")).unwrap().result;
    assert_eq!(one.status, JobStatus::Success, "{:?}", one.error);

    let two = &summary.get(&JobId::from("2")).unwrap().result;
    assert_eq!(two.status, JobStatus::Error);
    assert_eq!(two.elapsed, Duration::ZERO);
    assert!(two.error.as_deref().unwrap().contains("02_missing.sh"));
}

#[tokio::test(flavor = "multi_thread")]
async fn selection_and_metrics_output() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = dir.path().join("mdpipe.prom");
    let catalog = write_catalog(
        dir.path(),
        r#"
        exclude = ["3"]

        [[jobs]]
        id = 1
        program = "true"

        [[jobs]]
        id = 2
        program = "false"

        [[jobs]]
        id = 3
        program = "true"
        "#,
    );

    let plan = plan(
        &catalog,
        &["--exclude", "2", "--metrics-out", metrics.to_str().unwrap()],
    );
    assert_eq!(plan.registry.len(), 1);

    let summary = execute(&plan, std::io::sink(), &mut Vec::new()).await.unwrap();
    assert_eq!(summary.total_jobs(), 1);
    assert!(summary.all_succeeded());

    let text = fs::read_to_string(&metrics).unwrap();
    assert!(text.contains("mdpipe_jobs_completed_total{status=\"success\"} 1"));
    assert!(text.contains("mdpipe_jobs_running 0"));
}
