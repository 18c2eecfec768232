use crate::api::{CommunityClient, CommunityQueries};
use crate::cache::{
  purge_previous_session, CacheStore, MemoryStorage, NoopStorage, SessionStore, SqliteStorage,
};
use crate::config::{CacheBackend, Config};
use crate::event::{Event, EventHandler};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::extract_host;
use crate::ui::view::{View, ViewAction};
use crate::ui::{self, PostListView, ServiceListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{info, warn};

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Command overlay (after pressing :)
  command_input: CommandInput,

  /// Query factory shared by every view
  queries: CommunityQueries,

  config: Config,

  /// Header title
  title: String,

  /// Message from the last app-level command
  status: Option<String>,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = CommunityClient::new(&config)?;
    let store = build_store(config.cache.backend);
    if config.cache.purge_on_start {
      purge_previous_session(&store, &SessionStore::new(), None);
    }

    let queries = CommunityQueries::new(
      client,
      store,
      config.cache.ttl(),
      config.community.clone(),
    );

    let title = config
      .title
      .clone()
      .unwrap_or_else(|| extract_host(&config.api.url).to_string());

    let root = PostListView::recent(queries.clone(), config.posts.recent_size);

    Ok(Self {
      view_stack: vec![Box::new(root)],
      command_input: CommandInput::new(),
      queries,
      config,
      title,
      status: None,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(100));
    let result = self.event_loop(&mut terminal, &mut events).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        // Only the visible view polls; views underneath catch up when revealed
        if let Some(view) = self.view_stack.last_mut() {
          view.tick();
        }
      }
      Event::Resize => {}
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // A view with an open search box owns every key
    let capturing = self
      .current_view()
      .is_some_and(|view| view.is_capturing_input());

    if !capturing {
      match self.command_input.handle_key(key) {
        KeyResult::Handled => return,
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };

    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        self.status = None;
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          // Dropping the view cancels its in-flight fetches
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    self.status = None;
    match cmd {
      "recent" => {
        let view = PostListView::recent(self.queries.clone(), self.config.posts.recent_size);
        self.replace_root(Box::new(view));
      }
      "posts" => {
        let view = PostListView::browse(self.queries.clone(), self.config.posts.page_size);
        self.replace_root(Box::new(view));
      }
      "services" => {
        let view = ServiceListView::new(self.queries.clone(), self.config.posts.page_size);
        self.replace_root(Box::new(view));
      }
      "purge" => {
        self.queries.clear_cache();
        info!("cache purged on request");
        self.status = Some("cache purged".to_string());
      }
      "quit" => {
        self.should_quit = true;
      }
      "" => {}
      other => {
        self.status = Some(format!("unknown command: {}", other));
      }
    }
  }

  fn replace_root(&mut self, view: Box<dyn View>) {
    self.view_stack.clear();
    self.view_stack.push(view);
  }

  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut (dyn View + 'static)> {
    self.view_stack.last_mut().map(|v| v.as_mut())
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn community(&self) -> Option<&str> {
    self.queries.community()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label())
      .collect()
  }

  /// App-level message first, then whatever the visible view reports
  pub fn status(&self) -> Option<String> {
    self
      .status
      .clone()
      .or_else(|| self.current_view().and_then(|view| view.status()))
  }
}

/// Build the cache store for the configured backend.
///
/// A SQLite file that cannot be opened degrades to an in-memory cache
/// rather than keeping the app from starting.
fn build_store(backend: CacheBackend) -> CacheStore {
  match backend {
    CacheBackend::Sqlite => match SqliteStorage::open() {
      Ok(storage) => CacheStore::new(storage),
      Err(e) => {
        warn!(error = %e, "failed to open cache database, using in-memory cache");
        CacheStore::new(MemoryStorage::new())
      }
    },
    CacheBackend::Memory => CacheStore::new(MemoryStorage::new()),
    CacheBackend::Disabled => CacheStore::new(NoopStorage),
  }
}
