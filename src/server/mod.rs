//! Preview server with on-demand detail pages
//!
//! Detail pages are served from the public directory and regenerated in the
//! background once they are older than the `revalidate` interval. A uid with
//! no page yet gets the fallback page while its page is generated.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cms::ContentClient;
use crate::generator::{is_not_found, Generator};
use crate::SpaceTraveling;

/// Content client shared by request handlers and background regeneration
pub type SharedClient = Arc<dyn ContentClient>;

/// Result of the last background generation of a uid with no page on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    NotFound,
    Unavailable,
}

/// Most uids a failure log remembers at once
const MAX_FAILURES: usize = 1024;

/// Failed generations of uids with no page on disk
///
/// A failure answers for its uid until `ttl` has passed, after which the
/// next request retries the CMS. At most `cap` uids are kept.
struct FailureLog {
    entries: HashMap<String, (Failure, Instant)>,
    ttl: Duration,
    cap: usize,
}

impl FailureLog {
    fn new(ttl: Duration, cap: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            cap,
        }
    }

    /// The recorded failure for `uid`, unless it has expired
    fn get(&self, uid: &str) -> Option<Failure> {
        self.entries
            .get(uid)
            .filter(|(_, at)| at.elapsed() < self.ttl)
            .map(|(failure, _)| *failure)
    }

    fn record(&mut self, uid: &str, failure: Failure) {
        if !self.entries.contains_key(uid) && self.entries.len() >= self.cap {
            let ttl = self.ttl;
            self.entries.retain(|_, (_, at)| at.elapsed() < ttl);
            if self.entries.len() >= self.cap {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|(_, (_, at))| *at)
                    .map(|(uid, _)| uid.clone());
                if let Some(oldest) = oldest {
                    self.entries.remove(&oldest);
                }
            }
        }
        self.entries.insert(uid.to_string(), (failure, Instant::now()));
    }

    fn clear(&mut self, uid: &str) {
        self.entries.remove(uid);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Server state
pub struct ServerState {
    generator: Generator<SharedClient>,
    revalidate: Duration,
    regenerating: Mutex<HashSet<String>>,
    failures: Mutex<FailureLog>,
}

impl ServerState {
    /// Failures are remembered for the `revalidate` interval
    pub fn new(generator: Generator<SharedClient>, revalidate: Duration) -> Self {
        Self {
            generator,
            revalidate,
            regenerating: Mutex::new(HashSet::new()),
            failures: Mutex::new(FailureLog::new(revalidate, MAX_FAILURES)),
        }
    }
}

/// Build the router for a server state
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/post/:uid", get(post_handler))
        .route("/post/:uid/", get(post_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the preview server
pub async fn start(site: &SpaceTraveling, ip: &str, port: u16, open: bool) -> Result<()> {
    let client: SharedClient = Arc::new(site.client()?);
    let generator = Generator::new(site, client)?;
    let state = Arc::new(ServerState::new(generator, site.config.revalidate_interval()));
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!(
        "Detail pages regenerate after {}s. Press Ctrl+C to stop.",
        site.config.revalidate
    );

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Detail route
async fn post_handler(State(state): State<Arc<ServerState>>, Path(uid): Path<String>) -> Response {
    let (status, html, _) = serve_post(&state, &uid).await;
    (status, Html(html)).into_response()
}

/// Answer a detail request, possibly starting a background regeneration
async fn serve_post(
    state: &Arc<ServerState>,
    uid: &str,
) -> (StatusCode, String, Option<JoinHandle<()>>) {
    let path = match state.generator.post_file(uid) {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!("{}", e);
            return not_found_page(state);
        }
    };

    match tokio::fs::metadata(&path).await {
        Ok(metadata) => {
            let stale = metadata
                .modified()
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok())
                .is_some_and(|age| age >= state.revalidate);
            // read before regenerating so the stale copy is what gets served
            let read = tokio::fs::read_to_string(&path).await;
            let task = if stale {
                tracing::debug!("Serving stale page for {:?}", uid);
                spawn_regeneration(state, uid)
            } else {
                None
            };
            match read {
                Ok(html) => (StatusCode::OK, html, task),
                Err(e) => {
                    tracing::error!("Failed to read {:?}: {}", path, e);
                    let (status, html) = error_page(state);
                    (status, html, task)
                }
            }
        }
        Err(_) => {
            let failure = state
                .failures
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(uid);
            match failure {
                Some(Failure::NotFound) => not_found_page(state),
                Some(Failure::Unavailable) => {
                    let (status, html) = error_page(state);
                    (status, html, None)
                }
                None => {
                    let task = spawn_regeneration(state, uid);
                    match state.generator.renderer().render_fallback() {
                        Ok(html) => (StatusCode::OK, html, task),
                        Err(e) => {
                            tracing::error!("Failed to render fallback page: {}", e);
                            let (status, html) = error_page(state);
                            (status, html, task)
                        }
                    }
                }
            }
        }
    }
}

fn not_found_page(state: &ServerState) -> (StatusCode, String, Option<JoinHandle<()>>) {
    let html = state
        .generator
        .renderer()
        .render_not_found()
        .unwrap_or_default();
    (StatusCode::NOT_FOUND, html, None)
}

fn error_page(state: &ServerState) -> (StatusCode, String) {
    let html = state
        .generator
        .renderer()
        .render_error()
        .unwrap_or_default();
    (StatusCode::INTERNAL_SERVER_ERROR, html)
}

/// Regenerate a detail page unless one is already being regenerated
fn spawn_regeneration(state: &Arc<ServerState>, uid: &str) -> Option<JoinHandle<()>> {
    {
        let mut regenerating = state
            .regenerating
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if !regenerating.insert(uid.to_string()) {
            return None;
        }
    }

    let state = Arc::clone(state);
    let uid = uid.to_string();
    Some(tokio::spawn(async move {
        regenerate(&state, &uid).await;
        state
            .regenerating
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&uid);
    }))
}

async fn regenerate(state: &ServerState, uid: &str) {
    let failure = match state.generator.generate_post(uid).await {
        Ok(path) => {
            tracing::info!("Regenerated {:?}", path);
            None
        }
        Err(e) if is_not_found(&e) => {
            tracing::info!("Post {:?} no longer exists", uid);
            if let Err(e) = state.generator.remove_post(uid) {
                tracing::error!("Failed to remove page for {:?}: {}", uid, e);
            }
            Some(Failure::NotFound)
        }
        Err(e) => {
            tracing::error!("Failed to regenerate {:?}: {}", uid, e);
            Some(Failure::Unavailable)
        }
    };

    let mut failures = state.failures.lock().unwrap_or_else(|e| e.into_inner());
    match failure {
        Some(failure) => failures.record(uid, failure),
        None => failures.clear(uid),
    }
}

/// Fallback handler that serves generated files
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let public_dir = state.generator.public_dir().to_path_buf();
    let mut service = ServeDir::new(&public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => {
            match tokio::fs::read_to_string(public_dir.join("404.html")).await {
                Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
                Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
            }
        }
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::{site, MemoryCms};

    fn state(dir: &std::path::Path, cms: MemoryCms, revalidate: Duration) -> Arc<ServerState> {
        let site = site(dir);
        let client: SharedClient = Arc::new(cms);
        let generator = Generator::new(&site, client).unwrap();
        Arc::new(ServerState::new(generator, revalidate))
    }

    #[tokio::test]
    async fn test_missing_page_falls_back_then_serves() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), MemoryCms::with_posts(&["a"]), Duration::from_secs(1800));

        let (status, html, task) = serve_post(&state, "a").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Carregando..."));
        task.expect("generation should start").await.unwrap();

        let (status, html, task) = serve_post(&state, "a").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Post a"));
        assert!(task.is_none(), "fresh page must not regenerate");
    }

    #[tokio::test]
    async fn test_unknown_uid_answers_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), MemoryCms::default(), Duration::from_secs(1800));

        let (_, _, task) = serve_post(&state, "ghost").await;
        task.unwrap().await.unwrap();

        for _ in 0..3 {
            let (status, html, task) = serve_post(&state, "ghost").await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert!(html.contains("Post não encontrado"));
            assert!(task.is_none(), "a known missing uid must not query the CMS again");
        }
    }

    #[tokio::test]
    async fn test_not_found_expires_after_revalidate() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), MemoryCms::default(), Duration::from_millis(50));

        let (_, _, task) = serve_post(&state, "later").await;
        task.unwrap().await.unwrap();
        let (status, _, _) = serve_post(&state, "later").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        tokio::time::sleep(Duration::from_millis(80)).await;
        let (status, html, task) = serve_post(&state, "later").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Carregando..."));
        assert!(task.is_some());
    }

    #[test]
    fn test_failure_log_is_capped() {
        let mut log = FailureLog::new(Duration::from_secs(1800), 2);
        let failures = [
            ("a", Failure::NotFound),
            ("b", Failure::Unavailable),
            ("c", Failure::NotFound),
        ];
        for (uid, failure) in failures {
            log.record(uid, failure);
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.get("a"), None);
        assert_eq!(log.get("b"), Some(Failure::Unavailable));
        assert_eq!(log.get("c"), Some(Failure::NotFound));

        log.clear("b");
        assert_eq!(log.get("b"), None);
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_dot_segment_uids_never_touch_public_dir() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), MemoryCms::with_posts(&["a"]), Duration::ZERO);
        state.generator.generate().await.unwrap();
        let public = state.generator.public_dir().to_path_buf();

        for uid in ["..", ".", ""] {
            let (status, html, task) = serve_post(&state, uid).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "uid {uid:?}");
            assert!(html.contains("Post não encontrado"));
            assert!(task.is_none());
        }
        assert!(public.join("index.html").exists());
        assert!(public.join("post/a/index.html").exists());
    }

    #[tokio::test]
    async fn test_cms_failure_answers_error_page() {
        let dir = tempfile::tempdir().unwrap();
        let cms = MemoryCms {
            fail_uid: Some("a".to_string()),
            ..MemoryCms::with_posts(&["a"])
        };
        let state = state(dir.path(), cms, Duration::from_secs(1800));

        let (_, _, task) = serve_post(&state, "a").await;
        task.unwrap().await.unwrap();

        let (status, html, _) = serve_post(&state, "a").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(html.contains("Não foi possível carregar o conteúdo"));
    }

    #[tokio::test]
    async fn test_stale_page_is_served_and_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), MemoryCms::with_posts(&["a"]), Duration::ZERO);
        let path = state.generator.generate_post("a").await.unwrap();
        std::fs::write(&path, "old copy").unwrap();

        let (status, html, task) = serve_post(&state, "a").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(html, "old copy");
        task.expect("stale page should regenerate").await.unwrap();

        let refreshed = std::fs::read_to_string(&path).unwrap();
        assert!(refreshed.contains("Post a"));
    }

    #[tokio::test]
    async fn test_deleted_post_page_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let revalidate = Duration::from_secs(60);
        let published = state(dir.path(), MemoryCms::with_posts(&["a"]), revalidate);
        let path = published.generator.generate_post("a").await.unwrap();
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(120))
            .unwrap();

        // same public dir, but the CMS no longer has the document
        let state = state(dir.path(), MemoryCms::default(), revalidate);

        let (status, _, task) = serve_post(&state, "a").await;
        assert_eq!(status, StatusCode::OK);
        task.unwrap().await.unwrap();
        assert!(!path.exists());

        let (status, _, _) = serve_post(&state, "a").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_single_regeneration_per_uid() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), MemoryCms::with_posts(&["a"]), Duration::from_secs(1800));

        let first = spawn_regeneration(&state, "a");
        let second = spawn_regeneration(&state, "a");
        assert!(first.is_some());
        assert!(second.is_none());
        first.unwrap().await.unwrap();
        assert!(spawn_regeneration(&state, "a").is_some());
    }
}
