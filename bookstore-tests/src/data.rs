//! Test data: account fixtures and schema locations, rooted at the crate
//! manifest directory so the harness can run from any working directory.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(rename = "userName")]
    pub user_name: String,
    pub password: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

static ACCOUNTS: Lazy<HashMap<String, Account>> = Lazy::new(|| {
    let path = testdata("account.json");
    let buf = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    serde_json::from_str(&buf)
        .unwrap_or_else(|e| panic!("cannot parse {}: {e}", path.display()))
});

/// Account fixture for `key`. Unknown keys yield `None`; callers decide
/// whether that is a failure.
pub fn account(key: &str) -> Option<&'static Account> {
    ACCOUNTS.get(key)
}

pub fn testdata(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(file)
}

pub fn schema(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("testdata/schemas")
        .join(file)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_account_resolves() {
        let account = account("account_01").expect("account_01 missing from fixtures");
        assert_eq!(account.user_name, "bookworm_01");
        assert!(!account.user_id.is_empty());
    }

    #[test]
    fn unknown_account_is_permissively_absent() {
        assert!(account("account_99").is_none());
    }

    #[test]
    fn schema_paths_point_into_testdata() {
        let path = schema("get_user_response.json");
        assert!(path.exists(), "{} missing", path.display());
    }
}
