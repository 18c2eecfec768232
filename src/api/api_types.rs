//! Serde-deserializable types matching community API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;

use super::types::{Comment, ListPage, Post, PostSummary, ReactionCounts, ServiceListing};

// ============================================================================
// Response envelope
// ============================================================================

/// Envelope wrapping every API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
  pub success: bool,
  pub data: Option<T>,
  pub error: Option<String>,
}

impl<T> ApiResponse<T> {
  /// Unwrap the payload. `success: false` and a missing payload are failures.
  pub fn into_result(self) -> Result<T> {
    if !self.success {
      return Err(eyre!(self
        .error
        .unwrap_or_else(|| "request failed".to_string())));
    }
    self
      .data
      .ok_or_else(|| eyre!(self.error.unwrap_or_else(|| "response had no data".to_string())))
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiListPage<T> {
  #[serde(default = "Vec::new")]
  pub items: Vec<T>,
  #[serde(default)]
  pub total: u64,
  #[serde(default = "first_page")]
  pub page: u32,
  #[serde(default)]
  pub size: u32,
  #[serde(default)]
  pub pages: u32,
}

fn first_page() -> u32 {
  1
}

impl<T> ApiListPage<T> {
  pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListPage<U> {
    ListPage {
      items: self.items.into_iter().map(f).collect(),
      total: self.total,
      page: self.page,
      size: self.size,
      pages: self.pages,
    }
  }
}

// ============================================================================
// Posts
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiAuthor {
  #[serde(rename = "displayName")]
  pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiPostSummary {
  pub id: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub category: String,
  pub author: Option<ApiAuthor>,
  #[serde(rename = "createdAt", default)]
  pub created_at: String,
  #[serde(rename = "viewCount", default)]
  pub view_count: u64,
  #[serde(rename = "likeCount", default)]
  pub like_count: u64,
  #[serde(rename = "commentCount", default)]
  pub comment_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct ApiPost {
  pub id: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub category: String,
  pub author: Option<ApiAuthor>,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(rename = "createdAt", default)]
  pub created_at: String,
  #[serde(rename = "updatedAt", default)]
  pub updated_at: String,
  #[serde(rename = "viewCount", default)]
  pub view_count: u64,
  #[serde(rename = "commentCount", default)]
  pub comment_count: u64,
  #[serde(flatten)]
  pub reactions: ApiReactionCounts,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiReactionCounts {
  #[serde(rename = "likeCount", default)]
  pub like_count: u64,
  #[serde(rename = "dislikeCount", default)]
  pub dislike_count: u64,
  #[serde(rename = "bookmarkCount", default)]
  pub bookmark_count: u64,
  #[serde(rename = "isLiked", default)]
  pub is_liked: bool,
  #[serde(rename = "isDisliked", default)]
  pub is_disliked: bool,
  #[serde(rename = "isBookmarked", default)]
  pub is_bookmarked: bool,
}

// ============================================================================
// Comments and services
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiComment {
  pub id: u64,
  pub author: Option<ApiAuthor>,
  #[serde(default)]
  pub content: String,
  #[serde(rename = "createdAt", default)]
  pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiService {
  pub id: u64,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub category: String,
  pub phone: Option<String>,
  #[serde(default)]
  pub description: String,
  pub rating: Option<f32>,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

fn author_name(author: Option<ApiAuthor>) -> String {
  author
    .map(|a| a.display_name)
    .unwrap_or_else(|| "anonymous".to_string())
}

impl From<ApiPostSummary> for PostSummary {
  fn from(p: ApiPostSummary) -> Self {
    PostSummary {
      id: p.id,
      title: p.title,
      category: p.category,
      author: author_name(p.author),
      created_at: p.created_at,
      views: p.view_count,
      likes: p.like_count,
      comments: p.comment_count,
    }
  }
}

impl From<ApiPost> for Post {
  fn from(p: ApiPost) -> Self {
    Post {
      id: p.id,
      title: p.title,
      category: p.category,
      author: author_name(p.author),
      content: p.content,
      tags: p.tags,
      created_at: p.created_at,
      updated_at: p.updated_at,
      views: p.view_count,
      reactions: p.reactions.into(),
      comments: p.comment_count,
    }
  }
}

impl From<ApiReactionCounts> for ReactionCounts {
  fn from(r: ApiReactionCounts) -> Self {
    ReactionCounts {
      likes: r.like_count,
      dislikes: r.dislike_count,
      bookmarks: r.bookmark_count,
      liked: r.is_liked,
      disliked: r.is_disliked,
      bookmarked: r.is_bookmarked,
    }
  }
}

impl From<ApiComment> for Comment {
  fn from(c: ApiComment) -> Self {
    Comment {
      id: c.id,
      author: author_name(c.author),
      content: c.content,
      created_at: c.created_at,
    }
  }
}

impl From<ApiService> for ServiceListing {
  fn from(s: ApiService) -> Self {
    ServiceListing {
      id: s.id,
      name: s.name,
      category: s.category,
      phone: s.phone,
      description: s.description,
      rating: s.rating,
    }
  }
}
