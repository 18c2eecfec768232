//! Stale-while-revalidate queries backed by the shared cache.
//!
//! A `SwrQuery<T>` owns one logical query: its cache key, ttl and fetcher.
//! Loading it shows whatever the cache holds right away and revalidates in the
//! background; the fresh value replaces the cached one when it arrives.
//!
//! # Example
//!
//! ```ignore
//! let client = client.clone();
//! let mut query = SwrQuery::new(key.cache_key(), ttl, store.clone(), move || {
//!     let client = client.clone();
//!     async move { client.list_posts(&filter).await.map_err(|e| e.to_string()) }
//! });
//!
//! // Show cached data (if any) and start revalidating
//! query.load();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use chrono::Duration;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::types::ListPage;
use crate::cache::{CacheSource, CacheStore};

/// What a view renders for one query.
#[derive(Debug, Clone)]
pub struct QueryView<T> {
  /// Last value shown, from cache or network
  pub data: Option<T>,
  /// No data to show yet and a fetch is running
  pub loading: bool,
  /// A fetch is running behind data that is already shown
  pub revalidating: bool,
  /// Message of the last failed fetch
  pub error: Option<String>,
  /// Where `data` came from
  pub source: Option<CacheSource>,
}

impl<T> Default for QueryView<T> {
  fn default() -> Self {
    Self {
      data: None,
      loading: false,
      revalidating: false,
      error: None,
      source: None,
    }
  }
}

impl<T> QueryView<ListPage<T>> {
  /// Items of the current page, empty until something has been loaded.
  pub fn items(&self) -> &[T] {
    self.data.as_ref().map(|p| p.items.as_slice()).unwrap_or(&[])
  }
}

type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// A spawned fetch. Dropping it aborts the task and discards its result.
struct InFlight<T> {
  receiver: mpsc::UnboundedReceiver<Result<T, String>>,
  handle: JoinHandle<()>,
}

impl<T> Drop for InFlight<T> {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

/// Stale-while-revalidate query.
///
/// A successful fetch writes the cache from its own task as soon as it
/// resolves, whether or not the owner is polling. View state only changes in
/// `poll()`. Dropping the query aborts a fetch that has not resolved yet, so
/// it never writes. There is no de-duplication across queries sharing a key:
/// the last fetch to resolve wins.
pub struct SwrQuery<T> {
  key: String,
  ttl: Duration,
  store: CacheStore,
  fetcher: FetcherFn<T>,
  view: QueryView<T>,
  in_flight: Option<InFlight<T>>,
}

impl<T> SwrQuery<T>
where
  T: Serialize + DeserializeOwned + Send + 'static,
{
  /// Create a query. Nothing happens until `load()` is called.
  pub fn new<F, Fut>(key: impl Into<String>, ttl: Duration, store: CacheStore, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      key: key.into(),
      ttl,
      store,
      fetcher: Box::new(move || fetcher().boxed()),
      view: QueryView::default(),
      in_flight: None,
    }
  }

  /// Show cached data if there is any, then revalidate from the network.
  ///
  /// With a cache hit the data is in `state()` when this returns, expired or
  /// not. Without one the view is marked loading until the fetch completes.
  pub fn load(&mut self) {
    match self.store.get::<T>(&self.key) {
      Some(cached) => {
        let source = if self.store.is_expired(&self.key) {
          CacheSource::CacheStale
        } else {
          CacheSource::CacheFresh
        };
        debug!(key = %self.key, ?source, "serving cached data");
        self.view.data = Some(cached);
        self.view.source = Some(source);
      }
      None => debug!(key = %self.key, "cache miss"),
    }
    self.start_fetch();
  }

  /// Fetch again without consulting the cache. Data already shown stays
  /// visible; a fetch still running for this query is cancelled.
  pub fn refetch(&mut self) {
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let in_flight = match &mut self.in_flight {
      Some(in_flight) => in_flight,
      None => return false,
    };

    let result = match in_flight.receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return false,
      // Sender dropped without sending
      Err(mpsc::error::TryRecvError::Disconnected) => Err("Query was cancelled".to_string()),
    };
    self.in_flight = None;
    self.view.loading = false;
    self.view.revalidating = false;

    match result {
      Ok(data) => {
        self.view.data = Some(data);
        self.view.source = Some(CacheSource::Network);
        self.view.error = None;
      }
      Err(error) => {
        // Data already on screen stays there
        warn!(key = %self.key, %error, "fetch failed");
        self.view.error = Some(error);
      }
    }
    true
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryView<T> {
    &self.view
  }

  /// Get the data shown, if any.
  pub fn data(&self) -> Option<&T> {
    self.view.data.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.view.loading
  }

  pub fn error(&self) -> Option<&str> {
    self.view.error.as_deref()
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    // Replacing the previous fetch aborts it
    self.in_flight = None;

    let (tx, rx) = mpsc::unbounded_channel();
    let future = (self.fetcher)();
    let store = self.store.clone();
    let key = self.key.clone();
    let ttl = self.ttl;
    let handle = tokio::spawn(async move {
      let result = future.await;
      if let Ok(data) = &result {
        store.set(&key, data, ttl);
        debug!(%key, "cache updated");
      }
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });

    self.in_flight = Some(InFlight {
      receiver: rx,
      handle,
    });
    self.view.error = None;
    if self.view.data.is_some() {
      self.view.revalidating = true;
    } else {
      self.view.loading = true;
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SwrQuery<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SwrQuery")
      .field("key", &self.key)
      .field("ttl", &self.ttl)
      .field("view", &self.view)
      .field("in_flight", &self.in_flight.is_some())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::api_types::ApiResponse;
  use crate::cache::testing::ManualClock;
  use crate::cache::MemoryStorage;
  use serde::Deserialize;
  use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration as StdDuration;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Post {
    id: u64,
  }

  fn post(id: u64) -> Post {
    Post { id }
  }

  fn page(items: Vec<Post>) -> ListPage<Post> {
    let total = items.len() as u64;
    ListPage {
      items,
      total,
      page: 1,
      size: 4,
      pages: 1,
    }
  }

  fn ttl() -> Duration {
    Duration::minutes(5)
  }

  /// Poll until the pending fetch has been applied.
  async fn settle<T>(query: &mut SwrQuery<T>)
  where
    T: Serialize + DeserializeOwned + Send + 'static,
  {
    for _ in 0..200 {
      if query.poll() {
        return;
      }
      tokio::time::sleep(StdDuration::from_millis(5)).await;
    }
    panic!("query did not settle");
  }

  fn returning(
    store: &CacheStore,
    value: ListPage<Post>,
  ) -> SwrQuery<ListPage<Post>> {
    SwrQuery::new("recent_posts", ttl(), store.clone(), move || {
      let value = value.clone();
      async move { Ok(value) }
    })
  }

  fn failing(store: &CacheStore, message: &'static str) -> SwrQuery<ListPage<Post>> {
    SwrQuery::new("recent_posts", ttl(), store.clone(), move || async move {
      ApiResponse::<ListPage<Post>> {
        success: false,
        data: None,
        error: Some(message.to_string()),
      }
      .into_result()
      .map_err(|e| e.to_string())
    })
  }

  #[tokio::test]
  async fn test_miss_loads_from_network() {
    let store = CacheStore::new(MemoryStorage::new());
    let mut query = returning(&store, page(vec![post(3)]));

    query.load();
    assert!(query.is_loading());
    assert!(query.data().is_none());

    settle(&mut query).await;

    let state = query.state();
    assert_eq!(state.items(), &[post(3)]);
    assert!(!state.loading);
    assert_eq!(state.error, None);
    assert_eq!(state.source, Some(CacheSource::Network));
    assert_eq!(
      store.get::<ListPage<Post>>("recent_posts"),
      Some(page(vec![post(3)]))
    );
  }

  #[tokio::test]
  async fn test_miss_with_failure_reports_error() {
    let store = CacheStore::new(MemoryStorage::new());
    let mut query = failing(&store, "timeout");

    query.load();
    settle(&mut query).await;

    let state = query.state();
    assert!(state.items().is_empty());
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("timeout"));
    assert_eq!(store.get::<ListPage<Post>>("recent_posts"), None);
  }

  #[tokio::test]
  async fn test_hit_serves_cached_then_fresh() {
    let store = CacheStore::new(MemoryStorage::new());
    store.set("recent_posts", &page(vec![post(1), post(2)]), ttl());
    let mut query = returning(&store, page(vec![post(9)]));

    query.load();
    // Cached value is visible before anything is awaited
    assert_eq!(query.state().items(), &[post(1), post(2)]);
    assert!(!query.is_loading());
    assert!(query.state().revalidating);
    assert_eq!(query.state().source, Some(CacheSource::CacheFresh));

    settle(&mut query).await;

    assert_eq!(query.state().items(), &[post(9)]);
    assert!(!query.state().revalidating);
    assert_eq!(query.state().source, Some(CacheSource::Network));
    assert_eq!(
      store.get::<ListPage<Post>>("recent_posts"),
      Some(page(vec![post(9)]))
    );
  }

  #[tokio::test]
  async fn test_expired_hit_is_still_served_and_revalidated() {
    let clock = Arc::new(ManualClock::new());
    let store = CacheStore::new(MemoryStorage::new()).with_clock(clock.clone());
    store.set("recent_posts", &page(vec![post(1)]), ttl());
    clock.advance(Duration::minutes(6));

    let mut query = returning(&store, page(vec![post(2)]));
    query.load();

    assert_eq!(query.state().items(), &[post(1)]);
    assert_eq!(query.state().source, Some(CacheSource::CacheStale));

    settle(&mut query).await;
    assert_eq!(query.state().items(), &[post(2)]);
    assert!(!store.is_expired("recent_posts"));
  }

  #[tokio::test]
  async fn test_failure_keeps_cached_data() {
    let store = CacheStore::new(MemoryStorage::new());
    store.set("recent_posts", &page(vec![post(1)]), ttl());
    let mut query = failing(&store, "timeout");

    query.load();
    settle(&mut query).await;

    let state = query.state();
    assert_eq!(state.items(), &[post(1)]);
    assert_eq!(state.error.as_deref(), Some("timeout"));
    assert!(!state.loading);
    assert_eq!(
      store.get::<ListPage<Post>>("recent_posts"),
      Some(page(vec![post(1)]))
    );
  }

  #[tokio::test]
  async fn test_refetch_keeps_data_visible() {
    let store = CacheStore::new(MemoryStorage::new());
    let mut query = returning(&store, page(vec![post(1)]));
    query.load();
    settle(&mut query).await;

    query.refetch();
    assert!(!query.is_loading());
    assert!(query.state().revalidating);
    assert_eq!(query.state().items(), &[post(1)]);

    settle(&mut query).await;
    assert!(!query.state().revalidating);
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let store = CacheStore::new(MemoryStorage::new());

    let mut query = SwrQuery::new("counter", ttl(), store, move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst))
      }
    });

    query.load();
    tokio::time::sleep(StdDuration::from_millis(10)).await;

    // Refetch aborts the first fetch and starts a new one
    query.refetch();
    settle(&mut query).await;

    assert_eq!(query.data(), Some(&0));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_drop_cancels_fetch() {
    let finished = Arc::new(AtomicBool::new(false));
    let finished_clone = finished.clone();
    let store = CacheStore::new(MemoryStorage::new());

    let mut query = SwrQuery::new("slow", ttl(), store.clone(), move || {
      let finished = finished_clone.clone();
      async move {
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        finished.store(true, Ordering::SeqCst);
        Ok::<_, String>(7u32)
      }
    });

    query.load();
    drop(query);
    tokio::time::sleep(StdDuration::from_millis(100)).await;

    assert!(!finished.load(Ordering::SeqCst));
    assert_eq!(store.get::<u32>("slow"), None);
  }

  fn delayed(store: &CacheStore, value: ListPage<Post>, delay_ms: u64) -> SwrQuery<ListPage<Post>> {
    SwrQuery::new("recent_posts", ttl(), store.clone(), move || {
      let value = value.clone();
      async move {
        tokio::time::sleep(StdDuration::from_millis(delay_ms)).await;
        Ok(value)
      }
    })
  }

  #[tokio::test]
  async fn test_last_resolved_fetch_wins() {
    let store = CacheStore::new(MemoryStorage::new());
    let mut slow = delayed(&store, page(vec![post(1)]), 60);
    let mut fast = delayed(&store, page(vec![post(2)]), 10);

    // Both fetch; neither is de-duplicated and neither is polled
    slow.load();
    fast.load();

    tokio::time::sleep(StdDuration::from_millis(30)).await;
    assert_eq!(
      store.get::<ListPage<Post>>("recent_posts"),
      Some(page(vec![post(2)]))
    );

    tokio::time::sleep(StdDuration::from_millis(100)).await;
    assert_eq!(
      store.get::<ListPage<Post>>("recent_posts"),
      Some(page(vec![post(1)]))
    );
  }

  #[tokio::test]
  async fn test_resolved_fetch_writes_cache_without_poll() {
    let store = CacheStore::new(MemoryStorage::new());
    let mut query = SwrQuery::new("recent_posts", ttl(), store.clone(), || async {
      Ok::<_, String>(42u32)
    });

    query.load();
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert_eq!(store.get::<u32>("recent_posts"), Some(42));
    // View state still waits for the owner
    assert!(query.data().is_none());

    drop(query);
    assert_eq!(store.get::<u32>("recent_posts"), Some(42));
  }

  #[tokio::test]
  async fn test_poll_without_fetch_is_noop() {
    let store = CacheStore::new(MemoryStorage::new());
    let mut query = returning(&store, page(vec![]));
    assert!(!query.poll());
    assert!(query.data().is_none());
  }
}
