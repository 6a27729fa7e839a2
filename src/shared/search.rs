//! Bounded substring search across a cursor-paginated listing endpoint.
//!
//! Pages are fetched one at a time, each through the retry policy, and records
//! are matched on their `id`. A scan stops on exhaustion, on either bound, or
//! when the cursor fails to advance. Any failure aborts the whole scan.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::client::{AgentsClient, ListParams, SortOrder};
use super::error::{AzaError, Result};
use super::payload::{record_id, Page};
use super::resource::Resource;
use super::retry::RetryPolicy;

pub const DEFAULT_MAX_RESULTS: u64 = 200;
pub const MAX_RESULTS_RANGE: (u64, u64) = (1, 1000);
pub const DEFAULT_SCAN_LIMIT: u64 = 5000;
pub const SCAN_LIMIT_RANGE: (u64, u64) = (1, 50_000);
pub const DEFAULT_PAGE_SIZE: u64 = 100;
pub const PAGE_SIZE_RANGE: (u64, u64) = (1, 200);

/// Parameters for one page fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub limit: u32,
    pub order: Option<SortOrder>,
    pub after: Option<String>,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page>;
}

/// A top-level listing endpoint of the agent service.
#[derive(Clone)]
pub struct ListingSource {
    client: AgentsClient,
    resource: Resource,
}

impl ListingSource {
    pub fn new(client: AgentsClient, resource: Resource) -> Result<Self> {
        if resource.collection().is_none() {
            return Err(AzaError::usage(format!(
                "{resource:?} cannot be searched without a parent id"
            )));
        }
        Ok(Self { client, resource })
    }
}

#[async_trait]
impl PageSource for ListingSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        let path = self.resource.collection().unwrap_or_default();
        let params = ListParams {
            limit: Some(request.limit),
            order: request.order,
            after: request.after.clone(),
            before: None,
        };
        let payload = self
            .client
            .get(self.resource.surface(), path, &params.to_query())
            .await?;
        Ok(Page::from_payload(payload, self.resource.list_key()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: usize,
    pub scan_limit: usize,
    pub page_size: u32,
    pub order: Option<SortOrder>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: DEFAULT_MAX_RESULTS as usize,
            scan_limit: DEFAULT_SCAN_LIMIT as usize,
            page_size: DEFAULT_PAGE_SIZE as u32,
            order: None,
        }
    }

    /// Build from loosely typed inputs such as URL query strings.
    pub fn from_raw(
        query: impl Into<String>,
        max_results: Option<&str>,
        scan_limit: Option<&str>,
        page_size: Option<&str>,
    ) -> Self {
        Self {
            query: query.into(),
            max_results: parse_bound(max_results, DEFAULT_MAX_RESULTS, MAX_RESULTS_RANGE) as usize,
            scan_limit: parse_bound(scan_limit, DEFAULT_SCAN_LIMIT, SCAN_LIMIT_RANGE) as usize,
            page_size: parse_bound(page_size, DEFAULT_PAGE_SIZE, PAGE_SIZE_RANGE) as u32,
            order: None,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = clamp(max_results as u64, MAX_RESULTS_RANGE) as usize;
        self
    }

    pub fn with_scan_limit(mut self, scan_limit: usize) -> Self {
        self.scan_limit = clamp(scan_limit as u64, SCAN_LIMIT_RANGE) as usize;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = clamp(page_size as u64, PAGE_SIZE_RANGE) as u32;
        self
    }

    pub fn with_order(mut self, order: Option<SortOrder>) -> Self {
        self.order = order;
        self
    }

    fn needle(&self) -> String {
        self.query.trim().to_lowercase()
    }
}

/// Leading integer of `raw`; missing, unparsable or zero values take `default`.
pub fn parse_bound(raw: Option<&str>, default: u64, range: (u64, u64)) -> u64 {
    let value = raw.and_then(leading_integer).filter(|v| *v != 0);
    match value {
        Some(v) if v < 0 => range.0,
        Some(v) => clamp(v as u64, range),
        None => default,
    }
}

fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Saturate absurdly long inputs; they clamp to the upper bound anyway.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}

fn clamp(value: u64, (min, max): (u64, u64)) -> u64 {
    value.clamp(min, max)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub matches: Vec<Value>,
    pub scanned: usize,
    pub matched: usize,
    /// The scan hit a bound while the upstream still reported more data.
    pub has_more_scanned: bool,
}

struct SearchState {
    cursor: Option<String>,
    scanned: usize,
    matches: Vec<Value>,
    has_more: bool,
}

impl SearchState {
    fn new() -> Self {
        Self {
            cursor: None,
            scanned: 0,
            matches: Vec::new(),
            has_more: true,
        }
    }

    fn finish(self, scan_limit: usize) -> SearchOutcome {
        let matched = self.matches.len();
        SearchOutcome {
            has_more_scanned: self.has_more && self.scanned < scan_limit,
            matches: self.matches,
            scanned: self.scanned,
            matched,
        }
    }
}

pub async fn search<S>(source: &S, query: &SearchQuery, retry: &RetryPolicy) -> Result<SearchOutcome>
where
    S: PageSource + ?Sized,
{
    let needle = query.needle();
    if needle.is_empty() {
        return Ok(SearchOutcome::default());
    }

    let mut state = SearchState::new();
    while state.has_more
        && state.scanned < query.scan_limit
        && state.matches.len() < query.max_results
    {
        let request = PageRequest {
            limit: query.page_size,
            order: query.order,
            after: state.cursor.clone(),
        };
        let request = &request;
        let page = retry.run(|| source.fetch_page(request)).await?;

        if page.records.is_empty() {
            state.has_more = false;
            break;
        }

        let upstream_has_more = page.has_more;
        let next_cursor = page.next_cursor();
        let page_len = page.records.len();

        for record in page.records {
            state.scanned += 1;
            if is_match(&record, &needle) {
                state.matches.push(record);
                if state.matches.len() >= query.max_results {
                    break;
                }
            }
            if state.scanned >= query.scan_limit {
                break;
            }
        }

        debug!(
            page_len,
            scanned = state.scanned,
            matched = state.matches.len(),
            cursor = state.cursor.as_deref().unwrap_or(""),
            "scanned page"
        );

        state.has_more = upstream_has_more;
        match next_cursor {
            Some(next) if state.cursor.as_deref() != Some(next.as_str()) => {
                state.cursor = Some(next);
            }
            _ => {
                state.has_more = false;
                break;
            }
        }
    }

    let outcome = state.finish(query.scan_limit);
    info!(
        query = %needle,
        scanned = outcome.scanned,
        matched = outcome.matched,
        has_more_scanned = outcome.has_more_scanned,
        "search finished"
    );
    Ok(outcome)
}

fn is_match(record: &Value, needle: &str) -> bool {
    record_id(record).is_some_and(|id| id.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::auth::Credential;
    use crate::shared::client::ClientConfig;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory upstream serving fixed pages keyed by the `after` cursor.
    struct MockPages {
        pages: Vec<Vec<&'static str>>,
        has_more_override: Option<bool>,
        rate_limited_calls: AtomicUsize,
        calls: Mutex<Vec<PageRequest>>,
    }

    impl MockPages {
        fn new(pages: Vec<Vec<&'static str>>) -> Self {
            Self {
                pages,
                has_more_override: None,
                rate_limited_calls: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageSource for MockPages {
        async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
            self.calls.lock().unwrap().push(request.clone());
            if self.rate_limited_calls.load(Ordering::SeqCst) > 0 {
                self.rate_limited_calls.fetch_sub(1, Ordering::SeqCst);
                return Err(AzaError::upstream(StatusCode::TOO_MANY_REQUESTS, "429"));
            }

            let index = match request.after.as_deref() {
                None => 0,
                Some(cursor) => self
                    .pages
                    .iter()
                    .position(|p| p.last() == Some(&cursor))
                    .map(|i| i + 1)
                    .unwrap_or(self.pages.len()),
            };
            let ids = self.pages.get(index).cloned().unwrap_or_default();
            Ok(Page {
                records: ids.iter().map(|id| json!({ "id": id })).collect(),
                has_more: self
                    .has_more_override
                    .unwrap_or(index + 1 < self.pages.len()),
                first_id: None,
                last_id: None,
            })
        }
    }

    fn ids(outcome: &SearchOutcome) -> Vec<String> {
        outcome
            .matches
            .iter()
            .filter_map(record_id)
            .map(|id| id.into_owned())
            .collect()
    }

    fn scenario() -> MockPages {
        MockPages::new(vec![
            vec!["abc1", "xyz"],
            vec!["abc2", "qqq"],
            vec!["abc3", "abc4"],
        ])
    }

    #[tokio::test]
    async fn stops_mid_page_once_max_results_reached() {
        let source = scenario();
        let query = SearchQuery::new("abc")
            .with_max_results(2)
            .with_scan_limit(100);

        let outcome = search(&source, &query, &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(ids(&outcome), vec!["abc1", "abc2"]);
        assert_eq!(outcome.scanned, 3);
        assert_eq!(outcome.matched, 2);
        assert!(outcome.has_more_scanned);
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn matches_are_case_insensitive_and_exhaustive() {
        let source = MockPages::new(vec![
            vec!["Conv_ABC", "conv_def"],
            vec!["CONV_abcd", "other"],
        ]);
        let query = SearchQuery::new("  AbC ");

        let outcome = search(&source, &query, &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(ids(&outcome), vec!["Conv_ABC", "CONV_abcd"]);
        assert_eq!(outcome.scanned, 4);
        assert!(!outcome.has_more_scanned);
    }

    #[tokio::test]
    async fn repeated_searches_are_identical() {
        let source = scenario();
        let query = SearchQuery::new("abc").with_max_results(3);
        let retry = RetryPolicy::default();

        let first = search(&source, &query, &retry).await.unwrap();
        let second = search(&source, &query, &retry).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_query_never_touches_upstream() {
        let source = scenario();
        let outcome = search(&source, &SearchQuery::new("   "), &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(outcome, SearchOutcome::default());
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn scan_limit_truncates_without_reporting_more() {
        let source = scenario();
        let query = SearchQuery::new("abc").with_scan_limit(3);

        let outcome = search(&source, &query, &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(ids(&outcome), vec!["abc1", "abc2"]);
        assert_eq!(outcome.scanned, 3);
        // A scan cut short by the scan limit reports no remainder.
        assert!(!outcome.has_more_scanned);
    }

    /// Serves pages of numeric ids, paged by the last id seen.
    struct NumericPages {
        calls: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl PageSource for NumericPages {
        async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
            self.calls.lock().unwrap().push(request.after.clone());
            let records = match request.after.as_deref() {
                None => vec![json!({"id": 1204}), json!({"id": 77})],
                Some("77") => vec![json!({"id": 312}), json!({"id": 9120})],
                Some(_) => Vec::new(),
            };
            Ok(Page {
                has_more: !records.is_empty(),
                records,
                first_id: None,
                last_id: None,
            })
        }
    }

    #[tokio::test]
    async fn numeric_ids_match_and_advance_the_cursor() {
        let source = NumericPages {
            calls: Mutex::new(Vec::new()),
        };
        let outcome = search(&source, &SearchQuery::new("12"), &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(ids(&outcome), vec!["1204", "312", "9120"]);
        assert_eq!(outcome.scanned, 4);
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec![None, Some("77".to_string()), Some("9120".to_string())]
        );
        assert!(!outcome.has_more_scanned);
    }

    /// Always serves the same page and cursor while claiming more data exists.
    struct StalledPages {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for StalledPages {
        async fn fetch_page(&self, _request: &PageRequest) -> Result<Page> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Page {
                records: vec![json!({"id": "a1"}), json!({"id": "a2"})],
                has_more: true,
                first_id: None,
                last_id: Some("stuck".to_string()),
            })
        }
    }

    #[tokio::test]
    async fn stalled_cursor_ends_the_scan() {
        let source = StalledPages {
            calls: AtomicUsize::new(0),
        };

        let outcome = search(&source, &SearchQuery::new("a"), &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.scanned, 4);
        assert_eq!(outcome.matched, 4);
        assert!(!outcome.has_more_scanned);
    }

    #[tokio::test]
    async fn empty_page_is_exhaustion() {
        let mut source = MockPages::new(vec![vec!["abc1"], vec![]]);
        source.has_more_override = Some(true);

        let outcome = search(&source, &SearchQuery::new("abc"), &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(ids(&outcome), vec!["abc1"]);
        assert_eq!(outcome.scanned, 1);
        assert!(!outcome.has_more_scanned);
    }

    #[tokio::test]
    async fn page_requests_carry_size_order_and_cursor() {
        let source = scenario();
        let query = SearchQuery::new("zzz")
            .with_page_size(2)
            .with_order(Some(SortOrder::Asc));

        search(&source, &query, &RetryPolicy::default())
            .await
            .unwrap();

        let calls = source.calls.lock().unwrap();
        let cursors: Vec<Option<&str>> = calls.iter().map(|c| c.after.as_deref()).collect();
        assert_eq!(cursors, vec![None, Some("xyz"), Some("qqq")]);
        assert!(calls
            .iter()
            .all(|c| c.limit == 2 && c.order == Some(SortOrder::Asc)));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limits_within_budget_are_absorbed() {
        let source = scenario();
        source.rate_limited_calls.store(2, Ordering::SeqCst);
        let started = tokio::time::Instant::now();

        let outcome = search(&source, &SearchQuery::new("abc4"), &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(ids(&outcome), vec!["abc4"]);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(1500), "waited {waited:?}");
        assert!(waited < Duration::from_millis(1510), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_abort_without_partial_results() {
        let source = scenario();
        source.rate_limited_calls.store(usize::MAX, Ordering::SeqCst);

        let err = search(&source, &SearchQuery::new("abc"), &RetryPolicy::default())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(source.call_count(), 4);
    }

    #[test]
    fn raw_bounds_follow_leading_integer_rules() {
        assert_eq!(parse_bound(None, 200, MAX_RESULTS_RANGE), 200);
        assert_eq!(parse_bound(Some("abc"), 200, MAX_RESULTS_RANGE), 200);
        assert_eq!(parse_bound(Some("0"), 200, MAX_RESULTS_RANGE), 200);
        assert_eq!(parse_bound(Some("-5"), 200, MAX_RESULTS_RANGE), 1);
        assert_eq!(parse_bound(Some("12abc"), 200, MAX_RESULTS_RANGE), 12);
        assert_eq!(parse_bound(Some("999999"), 200, MAX_RESULTS_RANGE), 1000);
        assert_eq!(
            parse_bound(Some("99999999999999999999999"), 5000, SCAN_LIMIT_RANGE),
            50_000
        );
    }

    #[test]
    fn typed_bounds_are_clamped() {
        let query = SearchQuery::new("x")
            .with_max_results(0)
            .with_scan_limit(1_000_000)
            .with_page_size(500);
        assert_eq!(query.max_results, 1);
        assert_eq!(query.scan_limit, 50_000);
        assert_eq!(query.page_size, 200);
    }

    async fn serve_pages(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/projects/demo")
    }

    #[tokio::test]
    async fn searches_a_live_listing_endpoint() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/api/projects/demo/openai/responses",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let counter = counter.clone();
                async move {
                    let call = counter.fetch_add(1, Ordering::SeqCst);
                    if call == 0 {
                        return (
                            StatusCode::TOO_MANY_REQUESTS,
                            Json(json!({"error": {"message": "slow down"}})),
                        );
                    }
                    assert_eq!(params.get("api-version").map(String::as_str), Some("2025-11-15-preview"));
                    assert_eq!(params.get("limit").map(String::as_str), Some("2"));
                    let body = match params.get("after").map(String::as_str) {
                        None => json!({
                            "data": [{"id": "resp_abc1"}, {"id": "resp_xyz"}],
                            "has_more": true,
                            "last_id": "resp_xyz",
                        }),
                        Some("resp_xyz") => json!({
                            "responses": [{"id": "resp_ABC2"}],
                            "has_more": false,
                        }),
                        Some(_) => json!({"data": []}),
                    };
                    (StatusCode::OK, Json(body))
                }
            }),
        );
        let project = serve_pages(app).await;

        let client = AgentsClient::new(
            AgentsClient::build_http().unwrap(),
            &ClientConfig::new(project),
            Credential::Static("test-token".to_string()),
        )
        .unwrap();
        let source = ListingSource::new(client, Resource::Responses).unwrap();
        let retry = RetryPolicy::new(3, Duration::from_millis(1));

        let outcome = search(&source, &SearchQuery::new("abc").with_page_size(2), &retry)
            .await
            .unwrap();

        assert_eq!(ids(&outcome), vec!["resp_abc1", "resp_ABC2"]);
        assert_eq!(outcome.scanned, 3);
        assert!(!outcome.has_more_scanned);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn nested_resources_are_not_searchable() {
        let client = AgentsClient::new(
            reqwest::Client::new(),
            &ClientConfig::new("https://example.com/api/projects/p"),
            Credential::Static("t".to_string()),
        )
        .unwrap();
        let err = ListingSource::new(client, Resource::Runs).err().unwrap();
        assert!(err.is_usage());
    }
}
