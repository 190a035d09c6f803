use std::fmt::Write as _;

use mdpipe_model::{RecordStatus, Summary};

const WIDTH: usize = 80;
const DESCRIPTION_CHARS: usize = 29;
const ERROR_CHARS: usize = 70;

/// Title block printed before a batch starts.
pub fn render_banner(title: &str, details: &[(&str, String)]) -> String {
    let rule = "=".repeat(WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "\n{rule}\n{title}\n{rule}\n");
    for (key, value) in details {
        let _ = writeln!(out, "{key}: {value}");
    }
    let _ = writeln!(out, "\n{rule}");
    out
}

/// Overview plus one row per job, in job id order.
pub fn render_table(summary: &Summary) -> String {
    let heavy = "=".repeat(WIDTH);
    let light = "-".repeat(WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "\n{heavy}\nEXECUTION SUMMARY\n{heavy}\n");
    let _ = writeln!(out, "Jobs Executed: {}", summary.total_jobs());
    let _ = writeln!(
        out,
        "  Successful: {} ({:.1}%)",
        summary.success_count(),
        summary.success_rate()
    );
    let _ = writeln!(out, "  Failed: {}", summary.failed_count());
    let _ = writeln!(
        out,
        "\nTotal CPU Time: {:.1} seconds",
        summary.total_elapsed().as_secs_f64()
    );

    let _ = writeln!(out, "\nJob Details:\n{light}");
    let _ = writeln!(
        out,
        "{:<10} {:<30} {:<15} {:<15}",
        "Job", "Description", "Status", "Time (sec)"
    );
    let _ = writeln!(out, "{light}");

    for (id, report) in summary.per_job() {
        let result = &report.result;
        let label = RecordStatus::from(result.status).label();
        let glyph = if result.status.is_success() { '✓' } else { '✗' };
        let status = format!("{glyph} {label}");
        let _ = writeln!(
            out,
            "{:<10} {:<30} {:<15} {:<15.1}",
            id.as_str(),
            truncate(&report.description, DESCRIPTION_CHARS),
            status,
            result.elapsed.as_secs_f64()
        );

        if !result.status.is_success() {
            if let Some(headline) = result.error_headline() {
                let _ = writeln!(out, "{:10} └─ Error: {}", "", truncate(headline, ERROR_CHARS));
            }
        }
    }
    let _ = writeln!(out, "{light}");
    out
}

/// Closing verdict line.
pub fn render_footer(summary: &Summary) -> String {
    let rule = "=".repeat(WIDTH);
    let verdict = if summary.all_succeeded() {
        "✓ ALL JOBS COMPLETED SUCCESSFULLY!".to_string()
    } else {
        format!("⚠ BATCH COMPLETED WITH {} FAILURE(S)", summary.failed_count())
    };
    format!("\n{rule}\n{verdict}\n{rule}\n")
}

/// At most `max` chars of `s`, never splitting a code point.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
