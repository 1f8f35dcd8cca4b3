use crate::api::Page;
use crate::error::FetchError;
use crate::utils::{Direction, ExportConfig};
use eyre::{Context, Result};
use std::time::Duration;
use url::Url;

/// Anything that can hand back one page of lifelogs for a cursor.
pub trait PageSource {
    /// `page` is the 1-based page number, used for diagnostics only.
    fn fetch_page(&self, page: usize, cursor: Option<&str>) -> Result<Page, FetchError>;
}

/// Query parameters sent with every page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub limit: u32,
    pub direction: Direction,
    pub include_markdown: bool,
    pub include_headings: bool,
    pub timezone: String,
}

impl QueryOptions {
    fn params(&self, cursor: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", self.limit.to_string()),
            ("direction", self.direction.as_str().to_string()),
            ("includeMarkdown", self.include_markdown.to_string()),
            ("includeHeadings", self.include_headings.to_string()),
            ("timezone", self.timezone.clone()),
        ];
        if let Some(c) = cursor {
            params.push(("cursor", c.to_string()));
        }
        params
    }
}

/// Blocking HTTP client for the lifelogs endpoint.
pub struct LifelogClient {
    http: reqwest::blocking::Client,
    endpoint: Url,
    api_key: String,
    query: QueryOptions,
}

const USER_AGENT: &str = concat!("lifelog-export/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY: usize = 500;

impl LifelogClient {
    pub fn new(
        endpoint: Url,
        api_key: impl Into<String>,
        query: QueryOptions,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .wrap_err("Failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint,
            api_key: api_key.into(),
            query,
        })
    }

    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.query.clone(),
            config.timeout,
        )
    }
}

impl PageSource for LifelogClient {
    fn fetch_page(&self, page: usize, cursor: Option<&str>) -> Result<Page, FetchError> {
        tracing::debug!(
            page,
            cursor = cursor.map(short_cursor).unwrap_or("<start>"),
            url = %self.endpoint,
            "Requesting lifelogs page"
        );

        let response = self
            .http
            .get(self.endpoint.clone())
            .header("X-API-Key", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&self.query.params(cursor))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            tracing::debug!(page, status = status.as_u16(), body = %body, "Lifelogs API returned error status");
            return Err(FetchError::from_status(status.as_u16(), body));
        }

        let body = response.bytes()?;
        Page::parse(&body, page)
    }
}

/// First 20 characters of a cursor, for logs.
fn short_cursor(cursor: &str) -> &str {
    match cursor.char_indices().nth(20) {
        Some((idx, _)) => &cursor[..idx],
        None => cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options() -> QueryOptions {
        QueryOptions {
            limit: 10,
            direction: Direction::Asc,
            include_markdown: true,
            include_headings: false,
            timezone: "Europe/Berlin".to_string(),
        }
    }

    // The blocking client owns its own runtime, so it is built, used and
    // dropped entirely on a blocking thread.
    async fn fetch(base: String, page: usize, cursor: Option<&'static str>) -> Result<Page, FetchError> {
        tokio::task::spawn_blocking(move || {
            let endpoint = Url::parse(&format!("{base}/v1/lifelogs")).unwrap();
            let client =
                LifelogClient::new(endpoint, "secret", options(), Duration::from_secs(5)).unwrap();
            client.fetch_page(page, cursor)
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn first_page_sends_key_and_query_without_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/lifelogs"))
            .and(header("X-API-Key", "secret"))
            .and(query_param("limit", "10"))
            .and(query_param("direction", "asc"))
            .and(query_param("includeMarkdown", "true"))
            .and(query_param("includeHeadings", "false"))
            .and(query_param("timezone", "Europe/Berlin"))
            .and(query_param_is_missing("cursor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "lifelogs": [ { "id": "a", "markdown": "hello" } ] },
                "meta": { "lifelogs": { "nextCursor": "next-1", "count": 1 } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = fetch(server.uri(), 1, None).await.unwrap();
        assert_eq!(page.lifelogs.len(), 1);
        assert_eq!(page.lifelogs[0].text(), "hello");
        assert_eq!(page.next_cursor.as_deref(), Some("next-1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cursor_is_sent_as_query_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/lifelogs"))
            .and(query_param("cursor", "next-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "lifelogs": [] },
                "meta": { "lifelogs": { "nextCursor": null, "count": 0 } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = fetch(server.uri(), 2, Some("next-1")).await.unwrap();
        assert!(page.lifelogs.is_empty());
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = fetch(server.uri(), 1, None).await.unwrap_err();
        assert!(err.is_auth());
        assert!(!err.is_retryable());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn service_unavailable_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetch(server.uri(), 1, None).await.unwrap_err();
        assert!(matches!(err, FetchError::Server { status: 503 }));
        assert!(err.is_retryable());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn body_without_lifelogs_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "nope" })))
            .mount(&server)
            .await;

        let err = fetch(server.uri(), 4, Some("c")).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed { page: 4, .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn connection_refused_is_a_retryable_network_error() {
        // Grab a free port, then release it so nothing is listening.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = fetch(format!("http://127.0.0.1:{port}"), 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn short_cursor_truncates_on_char_boundary() {
        assert_eq!(short_cursor("abc"), "abc");
        let long = "é".repeat(30);
        assert_eq!(short_cursor(&long).chars().count(), 20);
    }
}
