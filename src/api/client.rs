use crate::api::api_types::{
  ApiComment, ApiListPage, ApiPost, ApiPostSummary, ApiReactionCounts, ApiResponse, ApiService,
};
use crate::api::types::{
  normalize_search, Comment, ListPage, Post, PostFilter, PostSummary, Reaction, ReactionCounts,
  ServiceFilter, ServiceListing,
};
use crate::config::Config;
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// Community API client
#[derive(Clone)]
pub struct CommunityClient {
  http: reqwest::Client,
  base_url: Url,
  token: Option<String>,
}

impl CommunityClient {
  pub fn new(config: &Config) -> Result<Self> {
    Self::with_base_url(&config.api.url, Config::get_api_token())
  }

  pub fn with_base_url(base_url: &str, token: Option<String>) -> Result<Self> {
    // Url::join drops the last path segment unless the base ends with '/'
    let normalized = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let base_url =
      Url::parse(&normalized).map_err(|e| eyre!("Invalid API url {}: {}", base_url, e))?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("hearth/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      token,
    })
  }

  /// List posts matching a filter
  pub async fn list_posts(&self, filter: &PostFilter) -> Result<ListPage<PostSummary>> {
    let mut query = vec![
      ("sort", filter.sort.as_param().to_string()),
      ("page", filter.page.to_string()),
      ("size", filter.size.to_string()),
    ];
    push_common(
      &mut query,
      filter.community.as_deref(),
      &filter.search,
      filter.category.as_deref(),
    );

    let page: ApiListPage<ApiPostSummary> = self
      .get("posts", &query)
      .await
      .map_err(|e| eyre!("Failed to list posts: {}", e))?;

    Ok(page.map(PostSummary::from))
  }

  /// Get a single post by id
  pub async fn get_post(&self, id: u64) -> Result<Post> {
    let post: ApiPost = self
      .get(&format!("posts/{}", id), &[])
      .await
      .map_err(|e| eyre!("Failed to get post {}: {}", id, e))?;

    Ok(post.into())
  }

  /// List comments of a post
  pub async fn list_comments(&self, post_id: u64, page: u32, size: u32) -> Result<ListPage<Comment>> {
    let query = [("page", page.to_string()), ("size", size.to_string())];

    let comments: ApiListPage<ApiComment> = self
      .get(&format!("posts/{}/comments", post_id), &query)
      .await
      .map_err(|e| eyre!("Failed to list comments of post {}: {}", post_id, e))?;

    Ok(comments.map(Comment::from))
  }

  /// List the service directory
  pub async fn list_services(&self, filter: &ServiceFilter) -> Result<ListPage<ServiceListing>> {
    let mut query = vec![
      ("page", filter.page.to_string()),
      ("size", filter.size.to_string()),
    ];
    push_common(
      &mut query,
      filter.community.as_deref(),
      &filter.search,
      filter.category.as_deref(),
    );

    let page: ApiListPage<ApiService> = self
      .get("services", &query)
      .await
      .map_err(|e| eyre!("Failed to list services: {}", e))?;

    Ok(page.map(ServiceListing::from))
  }

  /// Apply a reaction to a post, returning the updated counters
  pub async fn react(&self, post_id: u64, reaction: Reaction) -> Result<ReactionCounts> {
    let endpoint = format!("posts/{}/{}", post_id, reaction.path_segment());
    let url = self.endpoint(&endpoint)?;
    debug!(%url, "POST");

    let response = self
      .authorize(self.http.post(url))
      .send()
      .await
      .map_err(|e| eyre!("Failed to {} post {}: {}", reaction.path_segment(), post_id, e))?;

    let counts: ApiReactionCounts = decode(response)
      .await
      .map_err(|e| eyre!("Failed to {} post {}: {}", reaction.path_segment(), post_id, e))?;

    Ok(counts.into())
  }

  async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T> {
    let url = self.endpoint(endpoint)?;
    debug!(%url, ?query, "GET");

    let response = self
      .authorize(self.http.get(url).query(query))
      .send()
      .await?;

    decode(response).await
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))
  }

  fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }
}

/// Add the optional filter parameters shared by collection endpoints
fn push_common(
  query: &mut Vec<(&'static str, String)>,
  community: Option<&str>,
  search: &str,
  category: Option<&str>,
) {
  if let Some(community) = community {
    query.push(("community", community.to_string()));
  }
  let search = normalize_search(search);
  if !search.is_empty() {
    query.push(("search", search));
  }
  if let Some(category) = category {
    query.push(("category", category.to_string()));
  }
}

/// Decode an enveloped response, preferring the envelope's error message
/// over the bare HTTP status.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
  let status = response.status();
  let body = response.bytes().await?;

  match serde_json::from_slice::<ApiResponse<T>>(&body) {
    Ok(envelope) => envelope.into_result(),
    Err(_) if !status.is_success() => Err(eyre!("HTTP {}", status)),
    Err(e) => Err(eyre!("Invalid response body: {}", e)),
  }
}
