//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `review_core` linkage.
//! - Run the two-review walkthrough against an in-memory store and print
//!   each step, so storage wiring can be checked without a host app.
//! - Write core log events under the system temp directory.

use review_core::{
    default_log_level, init_logging, logging_status, open_db_in_memory, RepoResult,
    ReviewRepository, SqliteReviewRepository,
};
use std::path::PathBuf;
use std::process::ExitCode;

const LOG_DIR_NAME: &str = "review_cli-logs";

fn main() -> ExitCode {
    println!("review_core ping={}", review_core::ping());
    println!("review_core version={}", review_core::core_version());

    match start_logging() {
        Ok((level, dir)) => println!("review_core logging level={level} dir={}", dir.display()),
        Err(err) => eprintln!("logging disabled: {err}"),
    }

    match run_walkthrough() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("walkthrough failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn start_logging() -> Result<(&'static str, PathBuf), String> {
    let log_dir = std::env::temp_dir().join(LOG_DIR_NAME);
    let dir = log_dir
        .to_str()
        .ok_or_else(|| format!("log dir `{}` is not valid UTF-8", log_dir.display()))?;
    init_logging(default_log_level(), dir)?;
    logging_status().ok_or_else(|| "logging did not report as active".to_string())
}

fn run_walkthrough() -> RepoResult<()> {
    let conn = open_db_in_memory()?;
    // Employees are owned elsewhere; seed one so reviews have a target.
    conn.execute_batch(
        "CREATE TABLE employees (id INTEGER PRIMARY KEY, name TEXT, job_title TEXT);
         INSERT INTO employees (id, name, job_title) VALUES (1, 'Lee', 'Manager');",
    )?;

    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table()?;

    let mut first = repo.create(2021, "ok", 1)?;
    let mut second = repo.create(2022, "ok2", 1)?;
    println!("created {first}");
    println!("created {second}");

    second.set_summary("ok2, revised")?;
    repo.update(&second)?;

    for review in repo.get_by_employee_id(1)? {
        println!("employee 1: {review}");
    }

    repo.delete(&mut first)?;
    println!("after delete: {first}, remaining={}", repo.get_all()?.len());

    repo.drop_table()?;
    Ok(())
}
