//! Load-more pagination over normalized post summaries
//!
//! A [`PaginationController`] owns the `{ results, next_page }` state of one
//! list view. The only mutation is [`PaginationController::load_more`], which
//! is single-flight, append-only and uid-deduplicating.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::cms::ContentClient;
use crate::content::{normalize_summary, ApiResponse, PostSummary};
use crate::error::{Error, Result};

/// Default bound on a single page fetch
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts loaded so far plus the pointer to the next page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPagination {
    pub results: Vec<PostSummary>,
    pub next_page: Option<String>,
}

impl PostPagination {
    /// Seed a pagination from a raw first page
    pub fn from_response(response: &ApiResponse) -> Self {
        let mut pagination = Self {
            results: Vec::with_capacity(response.results.len()),
            next_page: None,
        };
        pagination.append(response);
        pagination
    }

    /// Whether a load-more action should be offered
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Append a page, skipping entries without a uid and uids already present.
    /// Returns (appended, duplicates).
    fn append(&mut self, response: &ApiResponse) -> (usize, usize) {
        let mut seen: HashSet<String> = self.results.iter().map(|p| p.uid.clone()).collect();
        let mut appended = 0;
        let mut duplicates = 0;

        for entry in &response.results {
            let post = normalize_summary(entry);
            if post.uid.trim().is_empty() {
                tracing::warn!("Skipping entry without uid or id");
                continue;
            }
            if seen.insert(post.uid.clone()) {
                self.results.push(post);
                appended += 1;
            } else {
                tracing::warn!("Skipping duplicate post uid {:?}", post.uid);
                duplicates += 1;
            }
        }

        self.next_page = response
            .next_page
            .clone()
            .filter(|url| !url.trim().is_empty());
        (appended, duplicates)
    }
}

/// What a call to [`PaginationController::load_more`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and appended
    Loaded { appended: usize, duplicates: usize },
    /// There is no next page; nothing was fetched
    Exhausted,
    /// Another load was already running; this call was ignored
    InFlight,
    /// The view was dismissed while the fetch was running; the response was dropped
    Discarded,
}

/// Liveness token for the view that owns a pagination
#[derive(Debug, Clone)]
pub struct ViewHandle {
    alive: Arc<AtomicBool>,
}

impl ViewHandle {
    fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Mark the view as gone. In-flight responses will not be applied.
    pub fn dismiss(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Releases the busy flag on every exit path
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives load-more for one list view
pub struct PaginationController<C> {
    client: C,
    state: Mutex<PostPagination>,
    busy: AtomicBool,
    view: ViewHandle,
    timeout: Duration,
}

impl<C: ContentClient> PaginationController<C> {
    /// Create a controller seeded with the initial page
    pub fn new(client: C, initial: PostPagination) -> Self {
        Self {
            client,
            state: Mutex::new(initial),
            busy: AtomicBool::new(false),
            view: ViewHandle::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound each page fetch by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// A handle the owning view uses to signal dismissal
    pub fn view(&self) -> ViewHandle {
        self.view.clone()
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more()
    }

    pub fn is_loading(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.lock().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().results.is_empty()
    }

    /// A copy of the current state
    pub fn snapshot(&self) -> PostPagination {
        self.lock().clone()
    }

    /// Fetch the next page and append it
    ///
    /// On error the state is left exactly as it was.
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        if !self.view.is_alive() {
            return Err(Error::Dismissed);
        }
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            tracing::debug!("load_more ignored: a load is already in flight");
            return Ok(LoadOutcome::InFlight);
        };

        let Some(url) = self.lock().next_page.clone() else {
            return Ok(LoadOutcome::Exhausted);
        };

        tracing::debug!("Loading next page: {}", url);
        let response = match tokio::time::timeout(self.timeout, self.client.get_page(&url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Timeout {
                    url,
                    after: self.timeout,
                })
            }
        };

        if !self.view.is_alive() {
            tracing::debug!("Dropping page {} for a dismissed view", url);
            return Ok(LoadOutcome::Discarded);
        }

        let (appended, duplicates) = self.lock().append(&response);
        tracing::debug!(
            "Appended {} posts ({} duplicates skipped), more: {}",
            appended,
            duplicates,
            response.next_page.is_some()
        );
        Ok(LoadOutcome::Loaded {
            appended,
            duplicates,
        })
    }

    /// Keep loading until there is no next page or `max_pages` loads have run
    pub async fn load_all(&self, max_pages: Option<usize>) -> Result<usize> {
        let mut loads = 0;
        while self.has_more() && max_pages.map_or(true, |max| loads < max) {
            match self.load_more().await? {
                LoadOutcome::Loaded { .. } => loads += 1,
                _ => break,
            }
        }
        Ok(loads)
    }

    fn lock(&self) -> MutexGuard<'_, PostPagination> {
        // append() never leaves the state half-written
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::QueryOptions;
    use crate::content::RawEntry;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Serves canned pages by URL; unknown URLs fail
    #[derive(Default)]
    struct FakeClient {
        pages: HashMap<String, ApiResponse>,
        fetches: AtomicUsize,
        gate: Option<Arc<Notify>>,
        delay: Option<Duration>,
    }

    impl FakeClient {
        fn with_page(mut self, url: &str, uids: &[&str], next: Option<&str>) -> Self {
            self.pages.insert(url.to_string(), page(uids, next));
            self
        }
    }

    #[async_trait]
    impl ContentClient for FakeClient {
        async fn get_by_type(&self, _doc_type: &str, _options: &QueryOptions) -> Result<ApiResponse> {
            unreachable!("pagination never queries by type")
        }

        async fn get_by_uid(&self, _doc_type: &str, _uid: &str) -> Result<RawEntry> {
            unreachable!("pagination never queries by uid")
        }

        async fn get_page(&self, url: &str) -> Result<ApiResponse> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.pages.get(url).cloned().ok_or_else(|| Error::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::BAD_GATEWAY,
            })
        }
    }

    fn page(uids: &[&str], next: Option<&str>) -> ApiResponse {
        let results = uids
            .iter()
            .map(|uid| {
                serde_json::from_value(serde_json::json!({
                    "uid": uid,
                    "first_publication_date": "2021-03-25T12:00:00+0000",
                    "data": {"title": format!("Post {uid}"), "subtitle": "", "author": "A"}
                }))
                .unwrap()
            })
            .collect();
        ApiResponse {
            next_page: next.map(str::to_string),
            results,
            ..ApiResponse::default()
        }
    }

    fn uids(pagination: &PostPagination) -> Vec<&str> {
        pagination.results.iter().map(|p| p.uid.as_str()).collect()
    }

    #[tokio::test]
    async fn test_load_more_appends_and_terminates() {
        let client = FakeClient::default().with_page("/p2", &["b"], None);
        let initial = PostPagination::from_response(&page(&["a"], Some("/p2")));
        let controller = PaginationController::new(client, initial);
        assert!(controller.has_more());

        let outcome = controller.load_more().await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                appended: 1,
                duplicates: 0
            }
        );

        let state = controller.snapshot();
        assert_eq!(uids(&state), ["a", "b"]);
        assert_eq!(state.next_page, None);
        assert!(!controller.has_more());
    }

    #[tokio::test]
    async fn test_exhausted_does_not_fetch_or_mutate() {
        let client = FakeClient::default();
        let initial = PostPagination::from_response(&page(&["a"], None));
        let controller = PaginationController::new(client, initial.clone());

        for _ in 0..3 {
            assert_eq!(controller.load_more().await.unwrap(), LoadOutcome::Exhausted);
        }
        assert_eq!(controller.snapshot(), initial);
        assert_eq!(controller.client.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_unchanged() {
        let client = FakeClient::default();
        let initial = PostPagination::from_response(&page(&["a"], Some("/broken")));
        let controller = PaginationController::new(client, initial.clone());

        let err = controller.load_more().await.unwrap_err();
        assert!(matches!(err, Error::Status { .. }));
        assert_eq!(controller.snapshot(), initial);
        assert!(!controller.is_loading());

        // the action is still offered so the caller can retry
        assert!(controller.has_more());
    }

    #[tokio::test]
    async fn test_prefix_is_preserved_across_pages() {
        let client = FakeClient::default()
            .with_page("/p2", &["c", "d"], Some("/p3"))
            .with_page("/p3", &["e"], None);
        let initial = PostPagination::from_response(&page(&["a", "b"], Some("/p2")));
        let controller = PaginationController::new(client, initial);

        let before = controller.snapshot();
        controller.load_more().await.unwrap();
        let middle = controller.snapshot();
        assert_eq!(&middle.results[..before.results.len()], &before.results[..]);

        controller.load_more().await.unwrap();
        let after = controller.snapshot();
        assert_eq!(&after.results[..middle.results.len()], &middle.results[..]);
        assert_eq!(uids(&after), ["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_duplicate_uids_are_skipped() {
        let client = FakeClient::default().with_page("/p2", &["b", "c", "c", "d"], None);
        let initial = PostPagination::from_response(&page(&["a", "b"], Some("/p2")));
        let controller = PaginationController::new(client, initial);

        let outcome = controller.load_more().await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                appended: 2,
                duplicates: 2
            }
        );
        assert_eq!(uids(&controller.snapshot()), ["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_concurrent_load_is_ignored() {
        let gate = Arc::new(Notify::new());
        let client = FakeClient {
            gate: Some(gate.clone()),
            ..FakeClient::default().with_page("/p2", &["b"], None)
        };
        let initial = PostPagination::from_response(&page(&["a"], Some("/p2")));
        let controller = PaginationController::new(client, initial);

        let first = controller.load_more();
        let second = async {
            // runs while the first call is parked on the gate
            let outcome = controller.load_more().await;
            gate.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(second.unwrap(), LoadOutcome::InFlight);
        assert!(matches!(first.unwrap(), LoadOutcome::Loaded { appended: 1, .. }));
        assert_eq!(controller.client.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(uids(&controller.snapshot()), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_dismissed_view_drops_response() {
        let gate = Arc::new(Notify::new());
        let client = FakeClient {
            gate: Some(gate.clone()),
            ..FakeClient::default().with_page("/p2", &["b"], None)
        };
        let initial = PostPagination::from_response(&page(&["a"], Some("/p2")));
        let controller = PaginationController::new(client, initial.clone());
        let view = controller.view();

        let load = controller.load_more();
        let dismiss = async {
            view.dismiss();
            gate.notify_one();
        };
        let (outcome, _) = tokio::join!(load, dismiss);

        assert_eq!(outcome.unwrap(), LoadOutcome::Discarded);
        assert_eq!(controller.snapshot(), initial);
        assert!(matches!(controller.load_more().await, Err(Error::Dismissed)));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let client = FakeClient {
            delay: Some(Duration::from_secs(5)),
            ..FakeClient::default().with_page("/p2", &["b"], None)
        };
        let initial = PostPagination::from_response(&page(&["a"], Some("/p2")));
        let controller =
            PaginationController::new(client, initial.clone()).with_timeout(Duration::from_millis(50));

        let err = controller.load_more().await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(controller.snapshot(), initial);
    }

    #[tokio::test]
    async fn test_load_all_respects_limit() {
        let client = FakeClient::default()
            .with_page("/p2", &["b"], Some("/p3"))
            .with_page("/p3", &["c"], Some("/p4"))
            .with_page("/p4", &["d"], None);
        let initial = PostPagination::from_response(&page(&["a"], Some("/p2")));
        let controller = PaginationController::new(client, initial);

        assert_eq!(controller.load_all(Some(1)).await.unwrap(), 1);
        assert_eq!(controller.len(), 2);
        assert_eq!(controller.load_all(None).await.unwrap(), 2);
        assert_eq!(uids(&controller.snapshot()), ["a", "b", "c", "d"]);
        assert_eq!(controller.load_all(None).await.unwrap(), 0);
    }

    #[test]
    fn test_from_response_dedups_and_treats_blank_next_as_none() {
        let pagination = PostPagination::from_response(&page(&["a", "a", "b"], Some(" ")));
        assert_eq!(uids(&pagination), ["a", "b"]);
        assert!(!pagination.has_more());
    }

    #[tokio::test]
    async fn test_entries_without_uid_are_skipped() {
        let mut response = page(&["a"], Some("/p2"));
        for title in ["Orphan one", "Orphan two"] {
            let orphan: RawEntry =
                serde_json::from_value(serde_json::json!({"data": {"title": title, "author": "A"}}))
                    .unwrap();
            response.results.insert(0, orphan);
        }
        let pagination = PostPagination::from_response(&response);
        assert_eq!(uids(&pagination), ["a"]);

        let mut next = page(&["b"], None);
        next.results
            .push(serde_json::from_value(serde_json::json!({"uid": "", "data": {}})).unwrap());
        let client = FakeClient {
            pages: HashMap::from([("/p2".to_string(), next)]),
            ..FakeClient::default()
        };
        let controller = PaginationController::new(client, pagination);
        assert_eq!(
            controller.load_more().await.unwrap(),
            LoadOutcome::Loaded {
                appended: 1,
                duplicates: 0
            }
        );
        assert_eq!(uids(&controller.snapshot()), ["a", "b"]);
    }
}
