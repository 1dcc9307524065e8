//! Thin HTTP transport wrapper over `reqwest::Client`. The wrapper reads the
//! response body eagerly so that verification operates on a fully captured
//! `{status, headers, body}` value: one exchange, evaluated once, no retry at
//! this layer.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::*;

pub use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HttpError: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to deserialize http response into the specified type: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("{0:#}")]
    Unexpected(#[from] eyre::Error),
}

/// A fully captured HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Decode the captured body into a typed payload.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_str(&self.body)?)
    }

    async fn from(res: reqwest::Response) -> Response {
        Response {
            status: res.status(),
            headers: res.headers().clone(),
            body: res.text().await.unwrap_or_default(),
        }
    }
}

/// HTTP client shared by the service layer.
#[derive(Clone, Default)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub fn new() -> Client {
        Client::default()
    }

    pub fn get(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        RequestBuilder {
            inner: Some(self.inner.get(url)),
            client: self.inner.clone(),
        }
    }

    pub fn post(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        RequestBuilder {
            inner: Some(self.inner.post(url)),
            client: self.inner.clone(),
        }
    }

    pub fn put(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        RequestBuilder {
            inner: Some(self.inner.put(url)),
            client: self.inner.clone(),
        }
    }

    pub fn delete(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        RequestBuilder {
            inner: Some(self.inner.delete(url)),
            client: self.inner.clone(),
        }
    }
}

pub struct RequestBuilder {
    inner: Option<reqwest::RequestBuilder>,
    client: reqwest::Client,
}

impl RequestBuilder {
    pub fn json<T: serde::Serialize + ?Sized>(mut self, json: &T) -> RequestBuilder {
        self.inner = self.inner.take().map(|inner| inner.json(json));
        self
    }

    pub fn header<K, V>(mut self, key: K, value: V) -> RequestBuilder
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.inner = self.inner.take().map(|inner| inner.header(key, value));
        self
    }

    pub fn bearer(mut self, token: impl std::fmt::Display) -> RequestBuilder {
        self.inner = self.inner.take().map(|inner| inner.bearer_auth(token));
        self
    }

    pub async fn send(mut self) -> Result<Response, Error> {
        let req = self
            .inner
            .take()
            .ok_or_else(|| eyre::eyre!("request builder already consumed"))?
            .build()?;

        debug!("{} {}", req.method(), req.url());

        let res = Response::from(self.client.execute(req).await?).await;

        debug!("{} bytes, status {}", res.body.len(), res.status);

        Ok(res)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[tokio::test]
    async fn send_captures_status_and_body() -> eyre::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/BookStore/v1/Books")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"books":[{"isbn":"9781449325862"}]}"#)
            .create_async()
            .await;

        let client = Client::new();
        let res = client
            .get(format!("{}/BookStore/v1/Books", server.url()))
            .send()
            .await?;
        mock.assert_async().await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text(), r#"{"books":[{"isbn":"9781449325862"}]}"#);
        Ok(())
    }

    #[tokio::test]
    async fn json_decodes_typed_payload() -> eyre::Result<()> {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Book {
            isbn: String,
        }
        #[derive(Debug, Deserialize, PartialEq)]
        struct Books {
            books: Vec<Book>,
        }

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/books")
            .with_status(200)
            .with_body(r#"{"books":[{"isbn":"9781449337711"}]}"#)
            .create_async()
            .await;

        let res = Client::new()
            .get(format!("{}/books", server.url()))
            .send()
            .await?;
        let payload: Books = res.json()?;

        assert_eq!(payload.books[0].isbn, "9781449337711");
        Ok(())
    }

    #[tokio::test]
    async fn bearer_and_json_reach_the_wire() -> eyre::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/BookStore/v1/Books")
            .match_header("authorization", "Bearer token-123")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "userId": "user-1",
            })))
            .with_status(201)
            .create_async()
            .await;

        let res = Client::new()
            .post(format!("{}/BookStore/v1/Books", server.url()))
            .bearer("token-123")
            .json(&serde_json::json!({"userId": "user-1"}))
            .send()
            .await?;
        mock.assert_async().await;

        assert_eq!(res.status(), StatusCode::CREATED);
        Ok(())
    }
}
