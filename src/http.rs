//! Authenticated JSON client for the remote data service.
//!
//! Every call carries the optional bearer token and the job-wide timeout.
//! Non-2xx responses and bodies that are not valid JSON are errors; an empty
//! 2xx body decodes as `{}`.

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::HttpError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of response-body characters carried into an error.
const ERROR_BODY_PREVIEW: usize = 300;

/// Thin wrapper over `reqwest::Client` for the Workers API.
#[derive(Clone)]
pub struct WorkerClient {
    client: reqwest::Client,
    bearer_token: Option<SecretString>,
    timeout: Duration,
}

impl WorkerClient {
    pub fn new(bearer_token: Option<SecretString>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            bearer_token,
            timeout,
        }
    }

    /// `GET url?query` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, HttpError> {
        let request = self.client.get(url).query(query);
        let response = self.send(url, request).await?;
        decode(url, response).await
    }

    /// `POST url` with a JSON body and decode the JSON response.
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .client
            .post(url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/json; charset=utf-8",
            )
            .json(body);
        let response = self.send(url, request).await?;
        decode(url, response).await
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, HttpError> {
        let mut request = request.timeout(self.timeout);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                }
            } else {
                HttpError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }

        tracing::debug!(url, status = status.as_u16(), "Worker request succeeded");
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, HttpError> {
    let bytes = response.bytes().await.map_err(|e| HttpError::Request {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &bytes[..]
    };
    serde_json::from_slice(body).map_err(|e| HttpError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::{Value, json};

    fn client(token: Option<&str>) -> WorkerClient {
        WorkerClient::new(token.map(|t| SecretString::from(t.to_string())), DEFAULT_TIMEOUT)
    }

    #[tokio::test]
    async fn get_sends_query_and_bearer_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/tasks/closed")
                .query_param("date", "2026-01-22")
                .header("authorization", "Bearer secret-token");
            then.status(200).json_body(json!({"date": "2026-01-22"}));
        });

        let value: Value = client(Some("secret-token"))
            .get_json(&server.url("/api/tasks/closed"), &[("date", "2026-01-22")])
            .await
            .expect("get should succeed");

        mock.assert_calls(1);
        assert_eq!(value["date"], "2026-01-22");
    }

    #[tokio::test]
    async fn get_without_token_still_succeeds() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/inbox");
            then.status(200).json_body(json!({"items": []}));
        });

        let value: Value = client(None)
            .get_json(&server.url("/inbox"), &[])
            .await
            .expect("get should succeed");

        mock.assert_calls(1);
        assert_eq!(value["items"], json!([]));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/broken");
            then.status(502).body("bad gateway");
        });

        let err = client(None)
            .get_json::<Value>(&server.url("/broken"), &[])
            .await
            .unwrap_err();

        match err {
            HttpError::Status { status, body, .. } => {
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/garbled");
            then.status(200).body("<html>not json</html>");
        });

        let err = client(None)
            .get_json::<Value>(&server.url("/garbled"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Decode { .. }));
    }

    #[tokio::test]
    async fn empty_post_response_decodes_as_empty_object() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/daily_log")
                .header("content-type", "application/json; charset=utf-8")
                .json_body(json!({"target_date": "2026-01-22"}));
            then.status(200);
        });

        let value: Value = client(None)
            .post_json(&server.url("/api/daily_log"), &json!({"target_date": "2026-01-22"}))
            .await
            .expect("post should succeed");

        mock.assert_calls(1);
        assert_eq!(value, json!({}));
    }
}
