//! Per-suite test fixture: owns the suite's parent report node and wraps each
//! test method with child-node setup, panic capture, unconditional cleanup
//! and outcome recording.

use futures::FutureExt;
use once_cell::sync::OnceCell;
use std::{any::Any, future::Future, panic::AssertUnwindSafe};
use tracing::*;

use apitest_core::{
    cleanup,
    http::StatusCode,
    report::{self, Outcome},
    ResourceKind,
};

use crate::services::BookService;

pub struct Suite {
    name: &'static str,
    parent: OnceCell<report::Node>,
}

impl Suite {
    pub const fn new(name: &'static str) -> Suite {
        Suite {
            name,
            parent: OnceCell::new(),
        }
    }

    /// Registry key for one test method of this suite.
    pub fn key(&self, test_name: &str) -> String {
        format!("{}::{test_name}", self.name)
    }

    /// Run one test method: enter this suite's report scope, open a child
    /// node, execute the body, then drain this test's cleanup entries and
    /// record the outcome. Cleanup and outcome recording run whether the
    /// body passed, failed or panicked.
    pub async fn test<F>(&self, name: &str, body: F) -> eyre::Result<()>
    where
        F: Future<Output = eyre::Result<()>>,
    {
        let parent = self
            .parent
            .get_or_init(|| report::register_parent(self.name, None))
            .clone();
        let test_key = self.key(name);

        report::scope_with_parent(parent, async move {
            report::open_child(name, None)?;

            let result = AssertUnwindSafe(body).catch_unwind().await;
            let outcome = match result {
                Ok(Ok(())) => Outcome::Passed,
                Ok(Err(e)) => Outcome::Failed {
                    message: format!("{e:#}"),
                },
                Err(panic) => Outcome::Failed {
                    message: panic_message(panic.as_ref()),
                },
            };

            run_cleanup(&test_key).await;
            report::record_outcome(&outcome)?;

            match outcome {
                Outcome::Failed { message } => Err(eyre::eyre!(message)),
                Outcome::Passed | Outcome::Skipped { .. } => Ok(()),
            }
        })
        .await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("test panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("test panicked: {message}")
    } else {
        "test panicked with unknown message".to_string()
    }
}

/// Issue the compensating call for every entry registered under `test_key`.
/// Failures are logged loudly but never change the test outcome; a resource
/// left behind can poison later tests sharing the fixture data.
async fn run_cleanup(test_key: &str) {
    let entries = cleanup::drain(test_key);
    if entries.is_empty() {
        return;
    }

    let books = match BookService::new() {
        Ok(books) => books,
        Err(e) => {
            warn!("cleanup for {test_key} skipped, service unavailable: {e}");
            let _ = report::info(format!("cleanup: service unavailable: {e}"));
            return;
        }
    };

    for entry in entries {
        match entry.kind {
            ResourceKind::CollectionBook => {
                match books
                    .delete_book(&entry.token, &entry.owner, &entry.resource)
                    .await
                {
                    Ok(res) if res.status() == StatusCode::NO_CONTENT => {
                        let _ = report::info(format!(
                            "cleanup: deleted book {} from collection of {}",
                            entry.resource, entry.owner
                        ));
                    }
                    Ok(res) => {
                        warn!(
                            "cleanup for {test_key}: deleting book {} returned status {}",
                            entry.resource,
                            res.status()
                        );
                        let _ = report::info(format!(
                            "cleanup: deleting book {} returned status {}",
                            entry.resource,
                            res.status()
                        ));
                    }
                    Err(e) => {
                        warn!("cleanup for {test_key}: deleting book {} failed: {e}", entry.resource);
                        let _ = report::info(format!(
                            "cleanup: deleting book {} failed: {e}",
                            entry.resource
                        ));
                    }
                }
            }
        }
    }
}
