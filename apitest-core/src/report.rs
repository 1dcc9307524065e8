//! Hierarchical test report: a forest of parent nodes (one per suite) each
//! holding child nodes (one per test method) with ordered, timestamped log
//! entries.
//!
//! The "current parent" and "current child" bindings are stored in a
//! `tokio::task_local!` cell, so every logical execution flow — one suite
//! running its methods sequentially — owns an independent binding even when
//! suites run concurrently. Operations look the binding up explicitly and
//! fail with a context error instead of silently attaching entries to the
//! wrong node.
//!
//! ```text
//! scope ──> open_parent ──> open_child ──> log/info/pass/... ──> record_outcome
//!                                                                     │
//! forest (global, creation order) ──────────────── flush ──> report artifact
//! ```

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::{
    future::Future,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::*;

use crate::{Error, Result};

static FOREST: Lazy<Mutex<Vec<Node>>> = Lazy::new(|| Mutex::new(Vec::new()));

tokio::task_local! {
    static BINDING: Arc<Mutex<Binding>>;
}

#[derive(Default)]
struct Binding {
    parent: Option<Node>,
    child: Option<Node>,
}

/// Severity of a single report entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Pass,
    Fail,
    Skip,
}

/// Terminal status of a report node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Passed,
    Failed,
    Skipped,
}

/// One timestamped log line attached to a node.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub level: Level,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a test method as observed by the runner.
#[derive(Debug, Clone)]
pub enum Outcome {
    Passed,
    Failed { message: String },
    Skipped { message: String },
}

struct NodeInner {
    name: String,
    description: Option<String>,
    status: Status,
    entries: Vec<Entry>,
    children: Vec<Node>,
}

/// A report node, shared between the execution flow that writes to it and the
/// sink that serializes it.
#[derive(Clone)]
pub struct Node {
    inner: Arc<Mutex<NodeInner>>,
}

impl Node {
    fn new(name: &str, description: Option<&str>) -> Node {
        Node {
            inner: Arc::new(Mutex::new(NodeInner {
                name: name.to_string(),
                description: description.map(str::to_string),
                status: Status::Pending,
                entries: Vec::new(),
                children: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NodeInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    pub fn status(&self) -> Status {
        self.lock().status
    }

    /// Append a timestamped entry to this node.
    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.lock().entries.push(Entry {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn set_status(&self, status: Status) {
        self.lock().status = status;
    }

    fn add_child(&self, name: &str, description: Option<&str>) -> Node {
        let child = Node::new(name, description);
        self.lock().children.push(child.clone());
        child
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        let inner = self.lock();
        NodeSnapshot {
            name: inner.name.clone(),
            description: inner.description.clone(),
            status: inner.status,
            entries: inner.entries.clone(),
            children: inner.children.iter().map(Node::snapshot).collect(),
        }
    }
}

/// Immutable copy of a node tree, in creation order. This is the shape that
/// gets serialized into the report artifact.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub name: String,
    pub description: Option<String>,
    pub status: Status,
    pub entries: Vec<Entry>,
    pub children: Vec<NodeSnapshot>,
}

/// Run `fut` inside a fresh report scope: an execution context with no parent
/// or child bound.
pub async fn scope<F: Future>(fut: F) -> F::Output {
    BINDING
        .scope(Arc::new(Mutex::new(Binding::default())), fut)
        .await
}

/// Run `fut` inside a report scope pre-bound to an existing parent node.
/// Suite fixtures use this to re-enter their parent for each test method.
pub async fn scope_with_parent<F: Future>(parent: Node, fut: F) -> F::Output {
    BINDING
        .scope(
            Arc::new(Mutex::new(Binding {
                parent: Some(parent),
                child: None,
            })),
            fut,
        )
        .await
}

fn with_binding<T>(f: impl FnOnce(&mut Binding) -> Result<T>) -> Result<T> {
    BINDING
        .try_with(|cell| {
            let mut binding = cell
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            f(&mut binding)
        })
        .map_err(|_| Error::NoScope)?
}

/// Create a parent node and append it to the forest without binding it to any
/// scope. Used by fixtures that share one parent across scopes.
pub fn register_parent(name: &str, description: Option<&str>) -> Node {
    let node = Node::new(name, description);
    FOREST
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .push(node.clone());
    node
}

/// Create a parent node and bind it as the current parent of this scope.
/// Rebinding replaces the previous parent and clears any bound child.
pub fn open_parent(name: &str, description: Option<&str>) -> Result<Node> {
    with_binding(|binding| {
        let node = register_parent(name, description);
        binding.parent = Some(node.clone());
        binding.child = None;
        Ok(node)
    })
}

/// Create a child node under the current parent and bind it as the current
/// child. Only one child is active at a time; rebinding replaces it.
pub fn open_child(name: &str, description: Option<&str>) -> Result<Node> {
    with_binding(|binding| {
        let parent = binding.parent.as_ref().ok_or(Error::NoParentBound)?;
        let child = parent.add_child(name, description);
        binding.child = Some(child.clone());
        Ok(child)
    })
}

/// The currently bound child node.
pub fn current() -> Result<Node> {
    with_binding(|binding| binding.child.clone().ok_or(Error::NoChildBound))
}

/// Append a timestamped entry to the currently bound child node.
pub fn log(level: Level, message: impl Into<String>) -> Result<()> {
    current()?.log(level, message);
    Ok(())
}

pub fn info(message: impl Into<String>) -> Result<()> {
    log(Level::Info, message)
}

pub fn pass(message: impl Into<String>) -> Result<()> {
    log(Level::Pass, message)
}

pub fn fail(message: impl Into<String>) -> Result<()> {
    log(Level::Fail, message)
}

pub fn skip(message: impl Into<String>) -> Result<()> {
    log(Level::Skip, message)
}

/// Record the runner-observed outcome of the current test method as terminal
/// log entries and node status.
pub fn record_outcome(outcome: &Outcome) -> Result<()> {
    let node = current()?;
    match outcome {
        Outcome::Passed => {
            node.log(Level::Pass, "test passed");
            node.set_status(Status::Passed);
        }
        Outcome::Failed { message } => {
            node.log(Level::Fail, format!("test failed: {message}"));
            node.set_status(Status::Failed);
        }
        Outcome::Skipped { message } => {
            node.log(Level::Skip, format!("test skipped: {message}"));
            node.set_status(Status::Skipped);
        }
    }
    Ok(())
}

/// Immutable copy of the whole forest, parents in creation order.
pub fn snapshot() -> Vec<NodeSnapshot> {
    FOREST
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .iter()
        .map(Node::snapshot)
        .collect()
}

/// Serialize the whole forest to a JSON report artifact at `path`. Called
/// once at suite teardown. Collected results are unaffected if the write
/// fails; the caller decides how loudly to report the error.
pub fn flush(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let forest = snapshot();
    let json = serde_json::to_string_pretty(&forest)
        .map_err(|e| Error::ReportWrite(e.to_string()))?;

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(|e| {
                Error::ReportWrite(format!("cannot create {}: {e}", dir.display()))
            })?;
        }
    }
    std::fs::write(path, json)
        .map_err(|e| Error::ReportWrite(format!("cannot write {}: {e}", path.display())))?;

    info!("report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn current_returns_latest_child() {
        scope(async {
            open_parent("latest_child_suite", None).unwrap();
            for k in 0..5 {
                let name = format!("case_{k}");
                open_child(&name, None).unwrap();
                assert_eq!(current().unwrap().name(), name);
            }
        })
        .await;
    }

    #[tokio::test]
    async fn open_child_without_parent_fails_and_creates_nothing() {
        scope(async {
            let before = snapshot().len();
            assert!(matches!(
                open_child("orphan", None),
                Err(Error::NoParentBound)
            ));
            assert!(matches!(current(), Err(Error::NoChildBound)));
            assert_eq!(snapshot().len(), before);
        })
        .await;
    }

    #[test]
    fn operations_outside_scope_fail() {
        assert!(matches!(open_parent("no_scope", None), Err(Error::NoScope)));
        assert!(matches!(open_child("no_scope", None), Err(Error::NoScope)));
        assert!(matches!(current(), Err(Error::NoScope)));
    }

    #[tokio::test]
    async fn reopening_parent_rebinds_and_clears_child() {
        scope(async {
            open_parent("rebind_first", None).unwrap();
            open_child("first_child", None).unwrap();

            let second = open_parent("rebind_second", None).unwrap();
            assert!(matches!(current(), Err(Error::NoChildBound)));

            open_child("second_child", None).unwrap();
            let snap = second.snapshot();
            assert_eq!(snap.children.len(), 1);
            assert_eq!(snap.children[0].name, "second_child");
        })
        .await;
    }

    #[tokio::test]
    async fn entries_preserve_call_order() {
        scope(async {
            let parent = open_parent("entry_order_suite", None).unwrap();
            open_child("ordered", None).unwrap();
            info("first").unwrap();
            pass("second").unwrap();
            fail("third").unwrap();

            let snap = parent.snapshot();
            let entries = &snap.children[0].entries;
            assert_eq!(
                entries.iter().map(|e| e.message.as_str()).collect::<Vec<_>>(),
                vec!["first", "second", "third"]
            );
            assert_eq!(entries[0].level, Level::Info);
            assert_eq!(entries[1].level, Level::Pass);
            assert_eq!(entries[2].level, Level::Fail);
        })
        .await;
    }

    #[tokio::test]
    async fn concurrent_scopes_do_not_share_bindings() {
        let flow = |suite: &'static str, case: &'static str, msg: &'static str| async move {
            scope(async move {
                let parent = open_parent(suite, None).unwrap();
                tokio::task::yield_now().await;
                open_child(case, None).unwrap();
                tokio::task::yield_now().await;
                info(msg).unwrap();
                assert_eq!(current().unwrap().name(), case);
                parent.snapshot()
            })
            .await
        };

        let (a, b) = tokio::join!(
            flow("iso_suite_a", "case_a", "logged by a"),
            flow("iso_suite_b", "case_b", "logged by b"),
        );

        assert_eq!(a.children.len(), 1);
        assert_eq!(a.children[0].name, "case_a");
        assert_eq!(a.children[0].entries[0].message, "logged by a");

        assert_eq!(b.children.len(), 1);
        assert_eq!(b.children[0].name, "case_b");
        assert_eq!(b.children[0].entries[0].message, "logged by b");
    }

    #[tokio::test]
    async fn shared_parent_accumulates_children_across_scopes() {
        let parent = register_parent("shared_parent_suite", None);

        for name in ["method_one", "method_two"] {
            scope_with_parent(parent.clone(), async {
                open_child(name, None).unwrap();
                info("step").unwrap();
            })
            .await;
        }

        let snap = parent.snapshot();
        assert_eq!(
            snap.children.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["method_one", "method_two"]
        );
    }

    #[tokio::test]
    async fn outcome_is_recorded_on_the_child() {
        scope(async {
            open_parent("outcome_suite", None).unwrap();

            let child = open_child("passing", None).unwrap();
            record_outcome(&Outcome::Passed).unwrap();
            assert_eq!(child.status(), Status::Passed);

            let child = open_child("failing", None).unwrap();
            record_outcome(&Outcome::Failed {
                message: "expected status 201, got 400".into(),
            })
            .unwrap();
            let snap = child.snapshot();
            assert_eq!(snap.status, Status::Failed);
            assert_eq!(
                snap.entries.last().unwrap().message,
                "test failed: expected status 201, got 400"
            );

            let child = open_child("skipping", None).unwrap();
            record_outcome(&Outcome::Skipped {
                message: "environment unavailable".into(),
            })
            .unwrap();
            assert_eq!(child.status(), Status::Skipped);
            assert_eq!(child.snapshot().entries[0].level, Level::Skip);
        })
        .await;
    }

    #[tokio::test]
    async fn flush_writes_the_collected_tree() {
        let mut config_file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut config_file,
            b"[application]\nurl = \"https://api.example.com\"\n",
        )
        .unwrap();
        let cfg = crate::config::load(config_file.path()).unwrap();
        assert_eq!(cfg.application.url, "https://api.example.com");

        scope(async {
            open_parent("BookSuite", None).unwrap();
            open_child("AddBook", None).unwrap();
            info("step 1").unwrap();
            pass("verified").unwrap();
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        flush(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let parent = json
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["name"] == "BookSuite")
            .expect("BookSuite missing from report");

        let children = parent["children"].as_array().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["name"], "AddBook");

        let entries = children[0]["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["message"], "step 1");
        assert_eq!(entries[0]["level"], "info");
        assert_eq!(entries[1]["message"], "verified");
        assert_eq!(entries[1]["level"], "pass");
    }
}
