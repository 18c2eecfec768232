use serde::{Deserialize, Serialize};

/// Paginated result envelope returned by collection endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage<T> {
  pub items: Vec<T>,
  pub total: u64,
  pub page: u32,
  pub size: u32,
  pub pages: u32,
}

impl<T> ListPage<T> {
  pub fn has_next(&self) -> bool {
    self.page < self.pages
  }

  pub fn has_previous(&self) -> bool {
    self.page > 1
  }
}

impl<T> Default for ListPage<T> {
  fn default() -> Self {
    Self {
      items: Vec::new(),
      total: 0,
      page: 1,
      size: 0,
      pages: 0,
    }
  }
}

/// Post summary for list views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
  pub id: u64,
  pub title: String,
  pub category: String,
  pub author: String,
  pub created_at: String,
  pub views: u64,
  pub likes: u64,
  pub comments: u64,
}

/// Full post details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
  pub id: u64,
  pub title: String,
  pub category: String,
  pub author: String,
  pub content: String,
  pub tags: Vec<String>,
  pub created_at: String,
  pub updated_at: String,
  pub views: u64,
  pub reactions: ReactionCounts,
  pub comments: u64,
}

/// Comment on a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
  pub id: u64,
  pub author: String,
  pub content: String,
  pub created_at: String,
}

/// Entry in the community service directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceListing {
  pub id: u64,
  pub name: String,
  pub category: String,
  pub phone: Option<String>,
  pub description: String,
  pub rating: Option<f32>,
}

/// Reaction counters of a post, as seen by the current user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCounts {
  pub likes: u64,
  pub dislikes: u64,
  pub bookmarks: u64,
  pub liked: bool,
  pub disliked: bool,
  pub bookmarked: bool,
}

/// Reaction a user can apply to a post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
  Like,
  Dislike,
  Bookmark,
}

impl Reaction {
  pub fn path_segment(&self) -> &'static str {
    match self {
      Reaction::Like => "like",
      Reaction::Dislike => "dislike",
      Reaction::Bookmark => "bookmark",
    }
  }
}

// ============================================================================
// Filter / sort selection
// ============================================================================

/// Sort order accepted by the collection endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
  #[default]
  Created,
  Views,
  Likes,
  Comments,
}

impl SortKey {
  pub const ALL: [SortKey; 4] = [
    SortKey::Created,
    SortKey::Views,
    SortKey::Likes,
    SortKey::Comments,
  ];

  /// Query parameter value
  pub fn as_param(&self) -> &'static str {
    match self {
      SortKey::Created => "created",
      SortKey::Views => "views",
      SortKey::Likes => "likes",
      SortKey::Comments => "comments",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      SortKey::Created => "newest",
      SortKey::Views => "most viewed",
      SortKey::Likes => "most liked",
      SortKey::Comments => "most discussed",
    }
  }

  /// Next sort key in cycling order
  pub fn next(&self) -> SortKey {
    let idx = Self::ALL.iter().position(|k| k == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }
}

/// Post categories offered by the board
pub const POST_CATEGORIES: &[&str] = &["notice", "general", "market", "lost_found", "question"];

/// Service directory categories
pub const SERVICE_CATEGORIES: &[&str] = &["repair", "cleaning", "moving", "childcare", "tutoring"];

/// Cycle through `None` followed by each of `categories`
pub fn next_category(current: Option<&str>, categories: &[&'static str]) -> Option<String> {
  let next = match current {
    None => categories.first(),
    Some(c) => categories
      .iter()
      .position(|x| *x == c)
      .and_then(|i| categories.get(i + 1)),
  };
  next.map(|c| c.to_string())
}

/// Filter for the post collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilter {
  pub community: Option<String>,
  pub search: String,
  pub category: Option<String>,
  pub sort: SortKey,
  pub page: u32,
  pub size: u32,
}

impl PostFilter {
  pub fn new(community: Option<String>, size: u32) -> Self {
    Self {
      community,
      search: String::new(),
      category: None,
      sort: SortKey::default(),
      page: 1,
      size,
    }
  }
}

/// Filter for the service directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFilter {
  pub community: Option<String>,
  pub search: String,
  pub category: Option<String>,
  pub page: u32,
  pub size: u32,
}

impl ServiceFilter {
  pub fn new(community: Option<String>, size: u32) -> Self {
    Self {
      community,
      search: String::new(),
      category: None,
      page: 1,
      size,
    }
  }
}

/// Canonical form of free-text search: trimmed, inner whitespace runs
/// collapsed to one space. Case is kept. Both the request and the cache key
/// use this form, so equal keys always mean equal requests.
pub fn normalize_search(search: &str) -> String {
  search.split_whitespace().collect::<Vec<_>>().join(" ")
}
