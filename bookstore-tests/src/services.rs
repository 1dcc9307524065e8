//! Service layer over the Book Store API. Each call issues one HTTP exchange
//! and hands back the fully captured response for the test body to verify.

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use apitest_core::{
    cleanup::{self, CleanupEntry, ResourceKind},
    config,
    http::{Client, Error, Response},
};

use crate::data::Account;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    #[serde(rename = "userName")]
    user_name: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenPayload {
    pub token: Option<String>,
    pub status: Option<String>,
    pub result: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Isbn {
    pub isbn: String,
}

#[derive(Debug, Serialize)]
struct AddBooksRequest<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    #[serde(rename = "collectionOfIsbns")]
    collection_of_isbns: Vec<Isbn>,
}

#[derive(Debug, Serialize)]
struct DeleteBookRequest<'a> {
    isbn: &'a str,
    #[serde(rename = "userId")]
    user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct ReplaceBookRequest<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    isbn: &'a str,
}

/// Response payload of add-books and replace-book calls; extra book fields
/// are ignored.
#[derive(Debug, Deserialize)]
pub struct BooksPayload {
    pub books: Vec<Isbn>,
}

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub username: String,
    pub books: Vec<Isbn>,
}

fn base_url() -> apitest_core::Result<String> {
    let cfg = config::current()?;
    Ok(cfg.application.url.trim_end_matches('/').to_string())
}

/// Account endpoints plus a per-instance token cache keyed by account key.
pub struct AccountService {
    http: Client,
    base: String,
    tokens: Mutex<HashMap<String, String>>,
}

impl AccountService {
    pub fn new() -> apitest_core::Result<AccountService> {
        Ok(AccountService {
            http: Client::new(),
            base: base_url()?,
            tokens: Mutex::new(HashMap::new()),
        })
    }

    fn tokens(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub async fn generate_token(&self, account: &Account) -> Result<Response, Error> {
        self.http
            .post(format!("{}/Account/v1/GenerateToken", self.base))
            .json(&Credentials {
                user_name: &account.user_name,
                password: &account.password,
            })
            .send()
            .await
    }

    /// Generate a token for `account` and cache it under `key`.
    pub async fn store_token(&self, key: &str, account: &Account) -> eyre::Result<()> {
        let res = self.generate_token(account).await?;
        let payload: TokenPayload = res.json()?;
        let token = payload.token.ok_or_else(|| {
            eyre::eyre!(
                "token generation failed for {key}: status={:?} result={:?}",
                payload.status,
                payload.result
            )
        })?;
        self.tokens().insert(key.to_string(), token);
        Ok(())
    }

    pub fn token(&self, key: &str) -> Option<String> {
        self.tokens().get(key).cloned()
    }

    pub async fn get_user(&self, user_id: &str, token: &str) -> Result<Response, Error> {
        self.http
            .get(format!("{}/Account/v1/User/{user_id}", self.base))
            .bearer(token)
            .send()
            .await
    }
}

/// Book collection endpoints.
pub struct BookService {
    http: Client,
    base: String,
}

impl BookService {
    pub fn new() -> apitest_core::Result<BookService> {
        Ok(BookService {
            http: Client::new(),
            base: base_url()?,
        })
    }

    pub async fn add_books(
        &self,
        token: &str,
        user_id: &str,
        isbns: &[&str],
    ) -> Result<Response, Error> {
        self.http
            .post(format!("{}/BookStore/v1/Books", self.base))
            .bearer(token)
            .json(&AddBooksRequest {
                user_id,
                collection_of_isbns: isbns
                    .iter()
                    .map(|isbn| Isbn {
                        isbn: isbn.to_string(),
                    })
                    .collect(),
            })
            .send()
            .await
    }

    pub async fn delete_book(
        &self,
        token: &str,
        user_id: &str,
        isbn: &str,
    ) -> Result<Response, Error> {
        self.http
            .delete(format!("{}/BookStore/v1/Book", self.base))
            .bearer(token)
            .json(&DeleteBookRequest { isbn, user_id })
            .send()
            .await
    }

    pub async fn delete_all_books(&self, token: &str, user_id: &str) -> Result<Response, Error> {
        self.http
            .delete(format!("{}/BookStore/v1/Books?UserId={user_id}", self.base))
            .bearer(token)
            .send()
            .await
    }

    pub async fn replace_book(
        &self,
        token: &str,
        user_id: &str,
        old_isbn: &str,
        new_isbn: &str,
    ) -> Result<Response, Error> {
        self.http
            .put(format!("{}/BookStore/v1/Books/{old_isbn}", self.base))
            .bearer(token)
            .json(&ReplaceBookRequest {
                user_id,
                isbn: new_isbn,
            })
            .send()
            .await
    }
}

/// Register a book for deferred deletion at this test's teardown.
pub fn stage_book_cleanup(test_key: &str, user_id: &str, token: &str, isbn: &str) {
    cleanup::register(
        test_key,
        CleanupEntry {
            kind: ResourceKind::CollectionBook,
            owner: user_id.to_string(),
            token: token.to_string(),
            resource: isbn.to_string(),
        },
    );
}
