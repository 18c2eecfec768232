use crate::api::types::{next_category, ListPage, ServiceFilter, ServiceListing, SERVICE_CATEGORIES};
use crate::api::CommunityQueries;
use crate::query::SwrQuery;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{category_color, query_title, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

/// Local service directory with a detail pane for the selection
pub struct ServiceListView {
  queries: CommunityQueries,
  filter: ServiceFilter,
  query: SwrQuery<ListPage<ServiceListing>>,
  list_state: ListState,
  search: SearchInput,
}

impl ServiceListView {
  pub fn new(queries: CommunityQueries, page_size: u32) -> Self {
    let filter = ServiceFilter::new(queries.community().map(String::from), page_size);
    let mut query = queries.services(filter.clone());
    query.load();

    Self {
      queries,
      filter,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
    }
  }

  fn reload(&mut self) {
    self.query = self.queries.services(self.filter.clone());
    self.query.load();
    self.list_state.select(Some(0));
  }

  fn services(&self) -> &[ServiceListing] {
    self.query.state().items()
  }

  fn selected(&self) -> Option<&ServiceListing> {
    self
      .list_state
      .selected()
      .and_then(|idx| self.services().get(idx))
  }

  fn label(&self) -> String {
    let mut label = "Services".to_string();
    if let Some(category) = &self.filter.category {
      label.push_str(&format!(" in {}", category));
    }
    if !self.filter.search.is_empty() {
      label.push_str(&format!(" matching '{}'", self.filter.search));
    }
    label
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.services().len();
    ensure_valid_selection(&mut self.list_state, len);

    let page = self.query.data();
    let mut title = query_title(&self.label(), self.query.state(), page.map(|p| p.total));
    if let Some(page) = page {
      title.push_str(&format!("page {}/{} ", page.page, page.pages.max(1)));
    }

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.services().is_empty() && !self.query.is_loading() {
      let content = if self.query.error().is_some() {
        "Failed to load services. Press 'r' to retry."
      } else {
        "No services listed."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .services()
      .iter()
      .map(|service| {
        let rating = service
          .rating
          .map(|r| format!("★ {:.1}", r))
          .unwrap_or_default();
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<10}", truncate(&service.category, 10)),
            Style::default().fg(category_color(&service.category)),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<30}", truncate(&service.name, 30))),
          Span::styled(rating, Style::default().fg(Color::Yellow)),
        ]))
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

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::DarkGray));

    let Some(service) = self.selected() else {
      frame.render_widget(block, area);
      return;
    };

    let mut lines = vec![
      Line::from(Span::styled(
        service.name.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
      )),
      Line::from(Span::styled(
        service.category.as_str(),
        Style::default().fg(category_color(&service.category)),
      )),
    ];
    if let Some(phone) = &service.phone {
      lines.push(Line::from(vec![
        Span::styled("phone ", Style::default().fg(Color::DarkGray)),
        Span::styled(phone.as_str(), Style::default().fg(Color::Cyan)),
      ]));
    }
    lines.push(Line::default());
    lines.push(Line::from(service.description.as_str()));

    let paragraph = Paragraph::new(lines)
      .block(block)
      .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
  }
}

impl View for ServiceListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
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

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('c') => {
        self.filter.category = next_category(self.filter.category.as_deref(), SERVICE_CATEGORIES);
        self.filter.page = 1;
        self.reload();
      }
      KeyCode::Char('n') => {
        if self.query.data().is_some_and(|page| page.has_next()) {
          self.filter.page += 1;
          self.reload();
        }
      }
      KeyCode::Char('p') => {
        if self.query.data().is_some_and(|page| page.has_previous()) {
          self.filter.page -= 1;
          self.reload();
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
      .split(area);

    self.render_list(frame, chunks[0]);
    self.render_detail(frame, chunks[1]);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Services".to_string()
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
    vec![
      Shortcut::new(":", "command"),
      Shortcut::new("/", "search"),
      Shortcut::new("c", "category"),
      Shortcut::new("n/p", "page"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("q", "back"),
    ]
  }
}
