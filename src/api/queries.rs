//! Cached community queries.

use chrono::Duration;
use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::debug;

use crate::cache::{CacheStore, QueryKey};
use crate::query::SwrQuery;

use super::cache::CommunityQueryKey;
use super::client::CommunityClient;
use super::types::{
  Comment, ListPage, Post, PostFilter, PostSummary, Reaction, ReactionCounts, ServiceFilter,
  ServiceListing,
};

/// Builds stale-while-revalidate queries against the community API.
///
/// Reads go through the shared cache store; reactions are writes and are
/// sent straight to the client.
#[derive(Clone)]
pub struct CommunityQueries {
  client: CommunityClient,
  store: CacheStore,
  ttl: Duration,
  community: Option<String>,
}

impl CommunityQueries {
  pub fn new(
    client: CommunityClient,
    store: CacheStore,
    ttl: Duration,
    community: Option<String>,
  ) -> Self {
    Self {
      client,
      store,
      ttl,
      community,
    }
  }

  /// Community every query is scoped to
  pub fn community(&self) -> Option<&str> {
    self.community.as_deref()
  }

  /// Newest posts for the landing view.
  pub fn recent_posts(&self, size: u32) -> SwrQuery<ListPage<PostSummary>> {
    let key = CommunityQueryKey::RecentPosts {
      community: self.community.clone(),
      size,
    };
    let filter = PostFilter::new(self.community.clone(), size);
    self.posts_query(key, filter)
  }

  /// A page of posts. The community of `filter` is overridden by ours.
  pub fn posts(&self, filter: PostFilter) -> SwrQuery<ListPage<PostSummary>> {
    let filter = PostFilter {
      community: self.community.clone(),
      ..filter
    };
    self.posts_query(CommunityQueryKey::Posts(filter.clone()), filter)
  }

  /// A single post.
  pub fn post(&self, id: u64) -> SwrQuery<Post> {
    let client = self.client.clone();
    self.query(CommunityQueryKey::PostDetail { id }, move || {
      let client = client.clone();
      async move { client.get_post(id).await }
    })
  }

  /// A page of comments under a post.
  pub fn comments(&self, post_id: u64, page: u32, size: u32) -> SwrQuery<ListPage<Comment>> {
    let client = self.client.clone();
    let key = CommunityQueryKey::Comments {
      post_id,
      page,
      size,
    };
    self.query(key, move || {
      let client = client.clone();
      async move { client.list_comments(post_id, page, size).await }
    })
  }

  /// A page of the service directory.
  pub fn services(&self, filter: ServiceFilter) -> SwrQuery<ListPage<ServiceListing>> {
    let filter = ServiceFilter {
      community: self.community.clone(),
      ..filter
    };
    let client = self.client.clone();
    self.query(CommunityQueryKey::Services(filter.clone()), move || {
      let client = client.clone();
      let filter = filter.clone();
      async move { client.list_services(&filter).await }
    })
  }

  /// Apply a reaction (not cached - write operation).
  pub async fn react(&self, post_id: u64, reaction: Reaction) -> Result<ReactionCounts> {
    self.client.react(post_id, reaction).await
  }

  /// Drop every cached entry.
  pub fn clear_cache(&self) {
    self.store.clear_all(None);
  }

  fn posts_query(
    &self,
    key: CommunityQueryKey,
    filter: PostFilter,
  ) -> SwrQuery<ListPage<PostSummary>> {
    let client = self.client.clone();
    self.query(key, move || {
      let client = client.clone();
      let filter = filter.clone();
      async move { client.list_posts(&filter).await }
    })
  }

  fn query<T, F, Fut>(&self, key: CommunityQueryKey, fetch: F) -> SwrQuery<T>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let cache_key = key.cache_key();
    debug!(key = %cache_key, query = %key.description(), "new query");
    SwrQuery::new(cache_key, self.ttl, self.store.clone(), move || {
      let fut = fetch();
      async move { fut.await.map_err(|e| e.to_string()) }
    })
  }
}
