use crate::api::types::{Comment, ListPage, Post, Reaction, ReactionCounts};
use crate::api::CommunityQueries;
use crate::query::SwrQuery;
use crate::ui::renderfns::{category_color, format_count, query_title};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Comments fetched alongside a post
const COMMENT_PAGE_SIZE: u32 = 50;

/// View for displaying a post with its comments
pub struct PostDetailView {
  queries: CommunityQueries,
  id: u64,
  title: String,
  post: SwrQuery<Post>,
  comments: SwrQuery<ListPage<Comment>>,
  /// Reaction request in flight. Not cancelled on drop: the write should land.
  reaction: Option<(Reaction, oneshot::Receiver<Result<ReactionCounts, String>>)>,
  /// Counters returned by the last reaction, shown until the post is re-read
  counts_override: Option<ReactionCounts>,
  message: Option<String>,
  scroll: u16,
}

impl PostDetailView {
  pub fn new(queries: CommunityQueries, id: u64, title: String) -> Self {
    let mut post = queries.post(id);
    let mut comments = queries.comments(id, 1, COMMENT_PAGE_SIZE);
    post.load();
    comments.load();

    Self {
      queries,
      id,
      title,
      post,
      comments,
      reaction: None,
      counts_override: None,
      message: None,
      scroll: 0,
    }
  }

  fn react(&mut self, reaction: Reaction) {
    if self.reaction.is_some() {
      return;
    }

    let (tx, rx) = oneshot::channel();
    let queries = self.queries.clone();
    let id = self.id;
    tokio::spawn(async move {
      let result = queries
        .react(id, reaction)
        .await
        .map_err(|e| e.to_string());
      let _ = tx.send(result);
    });

    self.reaction = Some((reaction, rx));
    self.message = Some(format!("sending {}...", reaction.path_segment()));
  }

  fn poll_reaction(&mut self) {
    let Some((reaction, rx)) = &mut self.reaction else {
      return;
    };
    let reaction = *reaction;

    let result = match rx.try_recv() {
      Ok(result) => result,
      Err(oneshot::error::TryRecvError::Empty) => return,
      Err(oneshot::error::TryRecvError::Closed) => Err("reaction was dropped".to_string()),
    };
    self.reaction = None;

    match result {
      Ok(counts) => {
        info!(post = self.id, reaction = reaction.path_segment(), "reaction applied");
        self.counts_override = Some(counts);
        self.message = Some(format!("{} applied", reaction.path_segment()));
        // Reactions are never cached; re-read the post
        self.post.refetch();
      }
      Err(e) => {
        warn!(post = self.id, error = %e, "reaction failed");
        self.message = Some(format!("{} failed: {}", reaction.path_segment(), e));
      }
    }
  }

  fn reactions<'a>(&'a self, post: &'a Post) -> &'a ReactionCounts {
    self.counts_override.as_ref().unwrap_or(&post.reactions)
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let label = format!("#{} {}", self.id, self.title);
    let block = Block::default()
      .title(query_title(&label, self.post.state(), None))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let post = match self.post.data() {
      Some(post) => post,
      None => {
        let (text, color) = match self.post.error() {
          Some(error) => (format!("Error: {}\n\nPress 'r' to retry.", error), Color::Red),
          None => ("Loading post...".to_string(), Color::DarkGray),
        };
        frame.render_widget(Paragraph::new(text).style(Style::default().fg(color)), inner);
        return;
      }
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3),      // Meta
        Constraint::Length(1),      // Separator
        Constraint::Percentage(60), // Content
        Constraint::Min(3),         // Comments
      ])
      .split(inner);

    let counts = self.reactions(post);
    let flag = |on: bool| if on { "●" } else { "○" };
    let meta = vec![
      Line::from(vec![
        Span::styled(
          format!("{} ", post.category),
          Style::default().fg(category_color(&post.category)),
        ),
        Span::styled("by ", Style::default().fg(Color::DarkGray)),
        Span::styled(&post.author, Style::default().fg(Color::Cyan)),
        Span::styled(
          format!("  {}", post.created_at),
          Style::default().fg(Color::DarkGray),
        ),
      ]),
      Line::from(vec![
        Span::raw(format!(
          "{} like {}   {} dislike {}   {} bookmark {}   views {}",
          flag(counts.liked),
          format_count(counts.likes),
          flag(counts.disliked),
          format_count(counts.dislikes),
          flag(counts.bookmarked),
          format_count(counts.bookmarks),
          format_count(post.views),
        )),
      ]),
      Line::from(Span::styled(
        post
          .tags
          .iter()
          .map(|t| format!("#{}", t))
          .collect::<Vec<_>>()
          .join(" "),
        Style::default().fg(Color::Magenta),
      )),
    ];
    frame.render_widget(Paragraph::new(meta), chunks[0]);

    let sep = Paragraph::new("─".repeat(chunks[1].width as usize))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let content = Paragraph::new(post.content.as_str())
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(content, chunks[2]);

    self.render_comments(frame, chunks[3]);
  }

  fn render_comments(&self, frame: &mut Frame, area: Rect) {
    let state = self.comments.state();
    let total = self.comments.data().map(|p| p.total);
    let block = Block::default()
      .title(query_title("Comments", state, total))
      .borders(Borders::TOP)
      .border_style(Style::default().fg(Color::DarkGray));

    let items: Vec<ListItem> = state
      .items()
      .iter()
      .map(|c| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<14} ", c.author),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(c.content.replace('\n', " ")),
        ]))
      })
      .collect();

    frame.render_widget(List::new(items).block(block), area);
  }
}

impl View for PostDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.post.refetch();
        self.comments.refetch();
      }
      KeyCode::Char('l') => self.react(Reaction::Like),
      KeyCode::Char('d') => self.react(Reaction::Dislike),
      KeyCode::Char('b') => self.react(Reaction::Bookmark),
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("#{}", self.id)
  }

  fn tick(&mut self) {
    if self.post.poll() && self.post.error().is_none() {
      // Fresh counters from the server supersede the reaction response
      self.counts_override = None;
    }
    self.comments.poll();
    self.poll_reaction();
  }

  fn status(&self) -> Option<String> {
    self.message.clone()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("l", "like"),
      Shortcut::new("d", "dislike"),
      Shortcut::new("b", "bookmark"),
      Shortcut::new("j/k", "scroll"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("q", "back"),
    ]
  }
}
