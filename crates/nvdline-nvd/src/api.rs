//! NVD REST API transport: query parameters, page decoding, HTTP page source

use nvdline_core::http::{self, FetchError, HttpOptions};
use serde_json::Value;

use crate::feed::Feed;

/// Authentication header expected by the NVD API
const API_KEY_HEADER: &str = "apiKey";

/// `lastModStartDate` / `lastModEndDate` filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: String,
    pub end: String,
}

/// Parameters of one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub start_index: u64,
    pub results_per_page: u32,
    pub window: Option<TimeWindow>,
}

impl PageQuery {
    /// Query string pairs in the order the API documents them
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("startIndex", self.start_index.to_string()),
            ("resultsPerPage", self.results_per_page.to_string()),
        ];
        if let Some(w) = &self.window {
            params.push(("lastModStartDate", w.start.clone()));
            params.push(("lastModEndDate", w.end.clone()));
        }
        params
    }
}

/// One decoded response
#[derive(Debug, Clone)]
pub struct Page {
    /// Cursor offset that produced this page
    pub start_index: u64,
    /// `totalResults` as reported by this response
    pub total_results: u64,
    pub items: Vec<Value>,
}

impl Page {
    /// Decode a response body. An empty object means "no data" and yields `None`.
    ///
    /// A missing items key gives an empty page; a missing `totalResults` is 0.
    pub fn from_body(feed: Feed, start_index: u64, body: Value) -> Option<Page> {
        let Value::Object(mut obj) = body else {
            return None;
        };
        if obj.is_empty() {
            return None;
        }
        let total_results = obj
            .get("totalResults")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let items = match obj.remove(feed.items_key()) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        Some(Page {
            start_index,
            total_results,
            items,
        })
    }
}

/// Something that answers page queries with a raw JSON body.
///
/// `Ok(None)` means the upstream returned no body.
pub trait PageSource {
    fn fetch(&mut self, query: &PageQuery) -> Result<Option<Value>, FetchError>;
}

impl<T: PageSource + ?Sized> PageSource for &mut T {
    fn fetch(&mut self, query: &PageQuery) -> Result<Option<Value>, FetchError> {
        (**self).fetch(query)
    }
}

/// The real upstream: blocking GETs over the shared runtime
pub struct HttpPageSource {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for HttpPageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPageSource")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl HttpPageSource {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        opts: &HttpOptions,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: http::build_client(opts)?,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PageSource for HttpPageSource {
    fn fetch(&mut self, query: &PageQuery) -> Result<Option<Value>, FetchError> {
        http::get_json(
            &self.client,
            &self.endpoint,
            &[(API_KEY_HEADER, self.api_key.as_str())],
            &query.params(),
        )
    }
}
