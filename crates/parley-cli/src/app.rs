//! Application state machine and event dispatcher.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use parley_core::{
  composer::{Composer, SubmitOutcome},
  feed::FeedBinding,
  identity::{AccountChoice, Identity, NewAccount},
  session::{SessionController, SessionState},
  shell::{self, Screen},
  store::MessageQuery,
};
use parley_store_sqlite::{SqliteAccounts, SqliteStore};
use tokio::sync::watch;

// ─── Sign-in prompt ───────────────────────────────────────────────────────────

/// Which field of the new-account form has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
  DisplayName,
  Email,
}

/// The "use another account" form.
#[derive(Debug, Clone)]
pub struct AccountForm {
  pub display_name: String,
  pub email:        String,
  pub focus:        FormField,
}

impl AccountForm {
  fn new() -> Self {
    Self {
      display_name: String::new(),
      email:        String::new(),
      focus:        FormField::DisplayName,
    }
  }

  fn field_mut(&mut self) -> &mut String {
    match self.focus {
      FormField::DisplayName => &mut self.display_name,
      FormField::Email => &mut self.email,
    }
  }
}

/// The account picker shown on every sign-in.
#[derive(Debug, Clone)]
pub struct Picker {
  pub accounts: Vec<Identity>,
  pub filter:   String,
  /// Index into the filtered list; one past the end is "use another
  /// account".
  pub cursor:   usize,
}

impl Picker {
  /// Accounts whose name or email fuzzy-match the filter.
  pub fn filtered(&self) -> Vec<&Identity> {
    if self.filter.is_empty() {
      return self.accounts.iter().collect();
    }
    let matcher = SkimMatcherV2::default();
    self
      .accounts
      .iter()
      .filter(|a| {
        matcher.fuzzy_match(&a.display_name, &self.filter).is_some()
          || a
            .email
            .as_deref()
            .is_some_and(|email| matcher.fuzzy_match(email, &self.filter).is_some())
      })
      .collect()
  }

  /// Number of selectable rows, including "use another account".
  fn rows(&self) -> usize { self.filtered().len() + 1 }
}

#[derive(Debug, Clone)]
pub enum Prompt {
  /// The welcome screen.
  Idle,
  Picker(Picker),
  NewAccount(AccountForm),
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  pub session:    SessionController<SqliteAccounts>,
  session_rx:     watch::Receiver<SessionState>,
  pub store:      SqliteStore,
  /// Mounted while a session is authenticated.
  pub feed:       Option<FeedBinding>,
  pub composer:   Composer,
  pub prompt:     Prompt,
  /// Blocking notice (auth failures); dismissed with Enter or Esc.
  pub notice:     Option<String>,
  /// One-line status message shown in the status bar.
  pub status_msg: String,
  feed_limit:     usize,
}

impl App {
  pub fn new(
    session: SessionController<SqliteAccounts>,
    store: SqliteStore,
    feed_limit: usize,
  ) -> Self {
    let session_rx = session.watch();
    Self {
      session,
      session_rx,
      store,
      feed: None,
      composer: Composer::new(),
      prompt: Prompt::Idle,
      notice: None,
      status_msg: String::new(),
      feed_limit,
    }
  }

  /// Resolve the persisted session and mount the feed if signed in.
  pub async fn start(&mut self) {
    self.session.resolve().await;
    self.sync_feed().await;
  }

  /// The screen to draw for the current state.
  pub fn screen(&self) -> Screen {
    let feed = self.feed.as_ref().map(FeedBinding::state);
    shell::compose(&self.session_rx.borrow(), feed.as_ref(), &self.composer)
  }

  /// Mount the feed for an authenticated session; unmount it and drop the
  /// draft otherwise.
  async fn sync_feed(&mut self) {
    let signed_in = self.session_rx.borrow().identity().is_some();
    match (signed_in, self.feed.is_some()) {
      (true, false) => {
        let query = MessageQuery::latest(self.feed_limit);
        self.feed = Some(FeedBinding::mount(&self.store, query).await);
      }
      (false, true) => {
        if let Some(feed) = self.feed.take() {
          feed.unmount();
        }
        self.composer.reset();
      }
      _ => {}
    }
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    // A notice blocks everything else until dismissed.
    if self.notice.is_some() {
      if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
        self.notice = None;
      }
      return Ok(true);
    }

    match self.screen() {
      Screen::Resolving => Ok(key.code != KeyCode::Char('q')),
      Screen::SignIn => self.handle_sign_in_key(key).await,
      Screen::Chat { .. } => self.handle_chat_key(key).await,
    }
  }

  async fn handle_sign_in_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match &mut self.prompt {
      Prompt::Idle => match key.code {
        KeyCode::Char('q') => return Ok(false),
        KeyCode::Enter => self.open_picker().await,
        _ => {}
      },

      Prompt::Picker(picker) => match key.code {
        KeyCode::Esc => self.finish_sign_in(None).await,
        KeyCode::Down => {
          if picker.cursor + 1 < picker.rows() {
            picker.cursor += 1;
          }
        }
        KeyCode::Up => picker.cursor = picker.cursor.saturating_sub(1),
        KeyCode::Backspace => {
          picker.filter.pop();
          picker.cursor = 0;
        }
        KeyCode::Char(c) => {
          picker.filter.push(c);
          picker.cursor = 0;
        }
        KeyCode::Enter => {
          let chosen = picker.filtered().get(picker.cursor).map(|a| a.uid.clone());
          match chosen {
            Some(uid) => {
              self
                .finish_sign_in(Some(AccountChoice::Existing { uid }))
                .await
            }
            None => self.prompt = Prompt::NewAccount(AccountForm::new()),
          }
        }
        _ => {}
      },

      Prompt::NewAccount(form) => match key.code {
        KeyCode::Esc => self.finish_sign_in(None).await,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
          form.focus = match form.focus {
            FormField::DisplayName => FormField::Email,
            FormField::Email => FormField::DisplayName,
          };
        }
        KeyCode::Backspace => {
          form.field_mut().pop();
        }
        KeyCode::Char(c) => form.field_mut().push(c),
        KeyCode::Enter => {
          let choice = AccountChoice::New(NewAccount {
            display_name: form.display_name.clone(),
            email:        form.email.clone(),
            avatar_url:   None,
          });
          self.finish_sign_in(Some(choice)).await;
        }
        _ => {}
      },
    }
    Ok(true)
  }

  /// Show the "select account" prompt.
  async fn open_picker(&mut self) {
    self.status_msg = "Loading accounts…".into();
    match self.session.accounts().await {
      Ok(accounts) => {
        self.prompt = Prompt::Picker(Picker { accounts, filter: String::new(), cursor: 0 });
        self.status_msg.clear();
      }
      Err(e) => {
        self.status_msg.clear();
        self.report(e);
      }
    }
  }

  async fn finish_sign_in(&mut self, choice: Option<AccountChoice>) {
    self.prompt = Prompt::Idle;
    self.status_msg = "Signing in…".into();
    let result = self.session.sign_in(choice).await;
    self.status_msg.clear();
    if let Err(e) = result {
      self.report(e);
    }
    self.sync_feed().await;
  }

  async fn handle_chat_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
      if key.code == KeyCode::Char('o') {
        self.sign_out().await;
      }
      return Ok(true);
    }

    match key.code {
      KeyCode::Enter => self.submit().await,
      KeyCode::Backspace => self.composer.backspace(),
      KeyCode::Esc => self.composer.reset(),
      KeyCode::Char(c) => self.composer.push(c),
      _ => {}
    }
    Ok(true)
  }

  async fn submit(&mut self) {
    self.status_msg = "Sending…".into();
    let outcome = self.composer.submit(&self.store, &self.session_rx).await;
    self.status_msg = match outcome {
      Ok(SubmitOutcome::Sent(_) | SubmitOutcome::Rejected(_)) => String::new(),
      Ok(SubmitOutcome::SessionEnded(_)) => "Sent, but you were signed out meanwhile.".into(),
      Err(e) => format!("{e}; press Enter to retry"),
    };
  }

  /// Auth failures block behind a notice; anything else goes to the status
  /// line.
  fn report(&mut self, e: parley_core::Error) {
    if e.is_blocking() {
      self.notice = Some(e.to_string());
    } else {
      self.status_msg = e.to_string();
    }
  }

  async fn sign_out(&mut self) {
    self.status_msg.clear();
    if let Err(e) = self.session.sign_out().await {
      self.report(e);
    }
    self.sync_feed().await;
  }
}
