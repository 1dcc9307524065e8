//! Harness entry point: loads the runtime configuration, runs every suite on
//! its own task (suites in parallel, methods sequential within a suite) and
//! writes the report artifact at the end.

mod data;
mod fixture;
mod services;
mod suites;

use tracing::*;
use tracing_subscriber::EnvFilter;

use apitest_core::{cleanup, config, report};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config_path = config::resolve_path("apitest.toml");
    let cfg = config::load(&config_path)?;
    info!("running against {}", cfg.application.url);

    cleanup::reset();

    let handles = [
        tokio::spawn(suites::add_book::run()),
        tokio::spawn(suites::delete_book::run()),
        tokio::spawn(suites::replace_book::run()),
        tokio::spawn(suites::get_user::run()),
    ];

    let mut failed = 0;
    for handle in handles {
        failed += handle.await?;
    }

    // best effort: collected results stand even if the artifact cannot be written
    if let Err(e) = report::flush(&cfg.report.path) {
        error!("report generation failed: {e}");
    }

    if failed > 0 {
        eyre::bail!("{failed} test(s) failed");
    }
    Ok(())
}
