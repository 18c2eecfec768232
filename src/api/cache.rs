//! Query keys for community API calls.

use crate::cache::QueryKey;

use super::types::{normalize_search, PostFilter, ServiceFilter};

/// Query key types for community API calls.
#[derive(Clone, Debug)]
pub enum CommunityQueryKey {
  /// Filtered, sorted page of posts
  Posts(PostFilter),
  /// Newest posts for the landing view
  RecentPosts {
    community: Option<String>,
    size: u32,
  },
  /// A single post
  PostDetail { id: u64 },
  /// A page of comments under a post
  Comments { post_id: u64, page: u32, size: u32 },
  /// Filtered page of the service directory
  Services(ServiceFilter),
}

impl QueryKey for CommunityQueryKey {
  fn namespace(&self) -> &'static str {
    match self {
      Self::Posts(_) => "posts",
      Self::RecentPosts { .. } => "recent_posts",
      Self::PostDetail { .. } => "post",
      Self::Comments { .. } => "comments",
      Self::Services(_) => "services",
    }
  }

  fn canonical(&self) -> String {
    match self {
      Self::Posts(f) => format!(
        "community={}&search={}&category={}&sort={}&page={}&size={}",
        f.community.as_deref().unwrap_or(""),
        normalize_search(&f.search),
        f.category.as_deref().unwrap_or(""),
        f.sort.as_param(),
        f.page,
        f.size
      ),
      Self::RecentPosts { community, size } => format!(
        "community={}&size={}",
        community.as_deref().unwrap_or(""),
        size
      ),
      Self::PostDetail { id } => format!("id={}", id),
      Self::Comments {
        post_id,
        page,
        size,
      } => format!("post={}&page={}&size={}", post_id, page, size),
      Self::Services(f) => format!(
        "community={}&search={}&category={}&page={}&size={}",
        f.community.as_deref().unwrap_or(""),
        normalize_search(&f.search),
        f.category.as_deref().unwrap_or(""),
        f.page,
        f.size
      ),
    }
  }

  fn description(&self) -> String {
    match self {
      Self::Posts(f) => {
        if f.search.trim().is_empty() {
          format!("posts page {} by {}", f.page, f.sort.label())
        } else {
          format!("posts matching '{}' page {}", f.search.trim(), f.page)
        }
      }
      Self::RecentPosts { community, .. } => match community {
        Some(c) => format!("recent posts for {}", c),
        None => "recent posts".to_string(),
      },
      Self::PostDetail { id } => format!("post {}", id),
      Self::Comments { post_id, page, .. } => format!("comments of post {} page {}", post_id, page),
      Self::Services(f) => format!("services page {}", f.page),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::SortKey;

  fn filter(search: &str) -> PostFilter {
    PostFilter {
      search: search.to_string(),
      ..PostFilter::new(Some("maple-court".to_string()), 20)
    }
  }

  #[test]
  fn test_search_whitespace_collides() {
    let a = CommunityQueryKey::Posts(filter("  Parking   Rules "));
    let b = CommunityQueryKey::Posts(filter("Parking Rules"));
    assert_eq!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn test_search_case_is_significant() {
    // The server may match case-sensitively, so these are distinct queries
    let a = CommunityQueryKey::Posts(filter("Parking"));
    let b = CommunityQueryKey::Posts(filter("parking"));
    assert_ne!(a.cache_key(), b.cache_key());

    let a = CommunityQueryKey::Services(ServiceFilter {
      search: "Plumber".to_string(),
      ..ServiceFilter::new(None, 20)
    });
    let b = CommunityQueryKey::Services(ServiceFilter {
      search: "plumber".to_string(),
      ..ServiceFilter::new(None, 20)
    });
    assert_ne!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn test_distinct_queries_do_not_collide() {
    let base = filter("");
    let sorted = PostFilter {
      sort: SortKey::Views,
      ..base.clone()
    };
    let paged = PostFilter {
      page: 2,
      ..base.clone()
    };
    let other_community = PostFilter {
      community: Some("oak-hill".to_string()),
      ..base.clone()
    };

    let keys: Vec<String> = [base, sorted, paged, other_community]
      .into_iter()
      .map(|f| CommunityQueryKey::Posts(f).cache_key())
      .collect();

    for (i, a) in keys.iter().enumerate() {
      for b in &keys[i + 1..] {
        assert_ne!(a, b);
      }
    }
  }

  #[test]
  fn test_namespaces_are_prefixes() {
    let posts = CommunityQueryKey::Posts(filter("")).cache_key();
    let recent = CommunityQueryKey::RecentPosts {
      community: None,
      size: 4,
    }
    .cache_key();
    let services = CommunityQueryKey::Services(ServiceFilter::new(None, 20)).cache_key();

    assert!(posts.starts_with("posts_"));
    assert!(recent.starts_with("recent_posts_"));
    // Clearing "posts_" must not touch the landing cache
    assert!(!recent.starts_with("posts_"));
    assert!(services.starts_with("services_"));
  }

  #[test]
  fn test_same_params_different_namespace() {
    let detail = CommunityQueryKey::PostDetail { id: 1 };
    let comments = CommunityQueryKey::Comments {
      post_id: 1,
      page: 1,
      size: 20,
    };
    assert_ne!(detail.cache_key(), comments.cache_key());
  }

  #[test]
  fn test_description() {
    assert_eq!(
      CommunityQueryKey::Posts(filter(" lost keys ")).description(),
      "posts matching 'lost keys' page 1"
    );
    assert_eq!(
      CommunityQueryKey::PostDetail { id: 42 }.description(),
      "post 42"
    );
  }
}
