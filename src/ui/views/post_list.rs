use crate::api::types::{next_category, ListPage, PostFilter, PostSummary, POST_CATEGORIES};
use crate::api::CommunityQueries;
use crate::query::SwrQuery;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{category_color, format_count, query_title, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::PostDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tracing::debug;

/// Which list the view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostListKind {
  /// Newest posts, fixed size, no filtering
  Recent,
  /// Full board with search, category, sort and paging
  Browse,
}

/// View for displaying a list of posts
pub struct PostListView {
  queries: CommunityQueries,
  kind: PostListKind,
  filter: PostFilter,
  query: SwrQuery<ListPage<PostSummary>>,
  list_state: ListState,
  search: SearchInput,
}

impl PostListView {
  /// Landing view with the newest posts
  pub fn recent(queries: CommunityQueries, size: u32) -> Self {
    Self::new(queries, PostListKind::Recent, size)
  }

  /// Board browser
  pub fn browse(queries: CommunityQueries, page_size: u32) -> Self {
    Self::new(queries, PostListKind::Browse, page_size)
  }

  fn new(queries: CommunityQueries, kind: PostListKind, size: u32) -> Self {
    let filter = PostFilter::new(queries.community().map(String::from), size);
    let query = Self::build_query(&queries, kind, &filter);

    let mut view = Self {
      queries,
      kind,
      filter,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
    };
    view.query.load();
    view
  }

  fn build_query(
    queries: &CommunityQueries,
    kind: PostListKind,
    filter: &PostFilter,
  ) -> SwrQuery<ListPage<PostSummary>> {
    match kind {
      PostListKind::Recent => queries.recent_posts(filter.size),
      PostListKind::Browse => queries.posts(filter.clone()),
    }
  }

  /// Swap in a query for the current filter; the old one is cancelled on drop.
  fn reload(&mut self) {
    debug!(filter = ?self.filter, "post filter changed");
    self.query = Self::build_query(&self.queries, self.kind, &self.filter);
    self.query.load();
    self.list_state.select(Some(0));
  }

  fn posts(&self) -> &[PostSummary] {
    self.query.state().items()
  }

  fn page(&self) -> Option<&ListPage<PostSummary>> {
    self.query.data()
  }

  fn label(&self) -> String {
    match self.kind {
      PostListKind::Recent => "Recent posts".to_string(),
      PostListKind::Browse => {
        let mut label = format!("Posts by {}", self.filter.sort.label());
        if let Some(category) = &self.filter.category {
          label.push_str(&format!(" in {}", category));
        }
        if !self.filter.search.is_empty() {
          label.push_str(&format!(" matching '{}'", self.filter.search));
        }
        label
      }
    }
  }

  fn handle_browse_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('s') => {
        self.filter.sort = self.filter.sort.next();
        self.filter.page = 1;
      }
      KeyCode::Char('c') => {
        self.filter.category = next_category(self.filter.category.as_deref(), POST_CATEGORIES);
        self.filter.page = 1;
      }
      KeyCode::Char('n') => {
        if !self.page().is_some_and(|page| page.has_next()) {
          return true;
        }
        self.filter.page += 1;
      }
      KeyCode::Char('p') => {
        if !self.page().is_some_and(|page| page.has_previous()) {
          return true;
        }
        self.filter.page -= 1;
      }
      _ => return false,
    }
    self.reload();
    true
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.posts().len();
    ensure_valid_selection(&mut self.list_state, len);

    let mut title = query_title(&self.label(), self.query.state(), self.page().map(|p| p.total));
    if let (PostListKind::Browse, Some(page)) = (self.kind, self.page()) {
      title.push_str(&format!("page {}/{} ", page.page, page.pages.max(1)));
    }

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.posts().is_empty() && !self.query.is_loading() {
      let content = if self.query.error().is_some() {
        "Failed to load posts. Press 'r' to retry."
      } else if !self.filter.search.is_empty() || self.filter.category.is_some() {
        "No posts match the current filter."
      } else {
        "No posts yet."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .posts()
      .iter()
      .map(|post| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<12}", truncate(&post.category, 12)),
            Style::default().fg(category_color(&post.category)),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<50}", truncate(&post.title, 50))),
          Span::raw(" "),
          Span::styled(
            format!("{:<14}", truncate(&post.author, 14)),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!(
              " ♥ {:>5}  ✎ {:>5}  ◉ {:>5}",
              format_count(post.likes),
              format_count(post.comments),
              format_count(post.views)
            ),
            Style::default().fg(Color::DarkGray),
          ),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for PostListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.kind == PostListKind::Browse {
      match self.search.handle_key(key, &self.filter.search) {
        KeyResult::Handled => return ViewAction::None,
        KeyResult::Event(event) => {
          let search = match event {
            SearchEvent::Submitted(search) => search,
            SearchEvent::Cleared => String::new(),
          };
          if search != self.filter.search {
            self.filter.search = search;
            self.filter.page = 1;
            self.reload();
          }
          return ViewAction::None;
        }
        KeyResult::NotHandled => {}
      }

      if self.handle_browse_key(key) {
        return ViewAction::None;
      }
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('r') => {
        self.query.refetch();
      }
      KeyCode::Enter => {
        let selected = self
          .list_state
          .selected()
          .and_then(|idx| self.posts().get(idx));
        if let Some(post) = selected {
          return ViewAction::Push(Box::new(PostDetailView::new(
            self.queries.clone(),
            post.id,
            post.title.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.kind {
      PostListKind::Recent => "Recent".to_string(),
      PostListKind::Browse => "Posts".to_string(),
    }
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn status(&self) -> Option<String> {
    self.query.error().map(|e| format!("last refresh failed: {}", e))
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    let mut shortcuts = vec![Shortcut::new(":", "command")];
    if self.kind == PostListKind::Browse {
      shortcuts.extend([
        Shortcut::new("/", "search"),
        Shortcut::new("s", "sort"),
        Shortcut::new("c", "category"),
        Shortcut::new("n/p", "page"),
      ]);
    }
    shortcuts.extend([Shortcut::new("r", "refresh"), Shortcut::new("q", "back")]);
    shortcuts
  }
}
