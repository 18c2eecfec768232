use crate::cache::CacheSource;
use crate::query::QueryView;
use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_chars: usize) -> String {
  if s.chars().count() <= max_chars {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Get the display color for a post or service category
pub fn category_color(category: &str) -> Color {
  match category {
    "notice" => Color::Red,
    "market" | "repair" | "cleaning" => Color::Yellow,
    "question" | "lost_found" => Color::Magenta,
    _ => Color::White,
  }
}

/// Compact counter: 999, 1.2k, 3.4m
pub fn format_count(n: u64) -> String {
  match n {
    0..=999 => n.to_string(),
    1_000..=999_999 => format!("{:.1}k", n as f64 / 1_000.0),
    _ => format!("{:.1}m", n as f64 / 1_000_000.0),
  }
}

/// Block title for a query-backed view: loading, error, or cache state
pub fn query_title<T>(label: &str, view: &QueryView<T>, count: Option<u64>) -> String {
  if view.loading {
    return format!(" {} (loading...) ", label);
  }
  if let Some(error) = &view.error {
    return format!(" {} (error: {}) ", label, error);
  }

  let state = match (view.revalidating, view.source) {
    (true, _) => Some("refreshing"),
    (false, Some(CacheSource::CacheStale)) => Some("stale"),
    (false, Some(CacheSource::CacheFresh)) => Some("cached"),
    _ => None,
  };

  let details: Vec<String> = count
    .map(|c| c.to_string())
    .into_iter()
    .chain(state.map(String::from))
    .collect();

  if details.is_empty() {
    format!(" {} ", label)
  } else {
    format!(" {} ({}) ", label, details.join(", "))
  }
}
