use std::{io, process::ExitCode};

use clap::Parser;
use tracing::error;

use mdpipe_observe::logger_init;
use mdpipe_runner::{Cli, Plan, execute, list_jobs};

const EXIT_FAILED_JOBS: u8 = 1;
const EXIT_CONFIG: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Before the runtime starts: the local UTC offset is only readable while
    // the process is single-threaded.
    if let Err(e) = logger_init(&cli.logger_config()) {
        eprintln!("mdpipe: {e}");
        return ExitCode::from(EXIT_CONFIG);
    }

    let plan = match Plan::from_cli(&cli) {
        Ok(plan) => plan,
        Err(e) => {
            error!(target: "mdpipe.runner", error = %e, "invalid configuration");
            eprintln!("mdpipe: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if cli.list {
        return match list_jobs(&plan, &mut io::stdout().lock()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("mdpipe: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("mdpipe: cannot start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        let mut out = io::stdout();
        execute(&plan, io::stdout(), &mut out).await
    });
    match result {
        Ok(summary) if summary.all_succeeded() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(EXIT_FAILED_JOBS),
        Err(e) => {
            error!(target: "mdpipe.runner", error = %format!("{e:#}"), "batch aborted");
            eprintln!("mdpipe: {e:#}");
            ExitCode::FAILURE
        }
    }
}
