//! Central application state for shipcheck.
//!
//! Owns everything the user types or navigates: the repository source, the
//! environment form, the answer fields of the current question round, plus the
//! channel and service indicators shown in the status bar. The session itself
//! lives in the core controller; this module only projects it (see
//! [`AppState::sync_round`]). No ratatui rendering happens here.

use shipcheck_core::controller::{QuestionRound, StartRequest};
use shipcheck_core::envconfig::{self, CustomPair, DiscreteFields, EnvironmentConfig};
use shipcheck_core::error::ValidationError;
use shipcheck_core::repos::RepositoryBrowser;
use shipcheck_core::service::Readiness;
use shipcheck_core::transport::ChannelEvent;
use shipcheck_core::types::AssessmentRecord;

/// Variable names of the fixed discrete fields, in display order.
pub const FIELD_NAMES: [&str; 5] = ["DATABASE_URL", "DB_HOST", "DB_PORT", "SECRET_KEY", "PORT"];

/// Which keybinding set is active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Keys go to the focused text field.
    Editing,
    HelpOverlay,
    HistoryOverlay,
}

/// The widget that has keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    RepositoryUrl,
    Token,
    Search,
    RepositoryList,
    EnvBlob,
    /// Index into [`FIELD_NAMES`].
    Field(usize),
    Bulk,
    CustomKey(usize),
    CustomValue(usize),
    Answer(usize),
}

impl Focus {
    pub fn is_editable(self) -> bool {
        self != Focus::RepositoryList
    }

    /// Enter inserts a newline instead of leaving edit mode.
    pub fn is_multiline(self) -> bool {
        matches!(self, Focus::EnvBlob | Focus::Answer(_))
    }
}

/// Single text input with a cursor kept on a char boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    value: String,
    /// Byte offset into `value`.
    cursor: usize,
}

impl TextField {
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.len();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn insert(&mut self, c: char) {
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some(c) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
            self.value.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
        }
    }

    pub fn left(&mut self) {
        if let Some(c) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
        }
    }

    pub fn right(&mut self) {
        if let Some(c) = self.value[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.len();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

/// Connection state of the analysis channel as seen by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChannelState {
    #[default]
    Connecting,
    Connected,
    /// Dropped; the transport retries on its own.
    Disconnected(String),
}

impl ChannelState {
    pub fn observe(&mut self, event: &ChannelEvent) {
        match event {
            ChannelEvent::Connected => *self = ChannelState::Connected,
            ChannelEvent::Disconnected { reason } => {
                *self = ChannelState::Disconnected(reason.clone());
            }
            ChannelEvent::Inbound { .. } => {}
        }
    }
}

/// All mutable UI state. Read by the renderer, mutated by the key dispatcher
/// and the event loop.
#[derive(Debug)]
pub struct AppState {
    pub mode: Mode,
    pub focus: Focus,

    /// Private source: the repository comes from the GitHub browser.
    pub private: bool,
    pub repository_url: TextField,
    pub token: TextField,
    pub search: TextField,
    pub browser: RepositoryBrowser,

    pub env_blob: TextField,
    /// One per [`FIELD_NAMES`] entry.
    pub fields: [TextField; 5],
    pub bulk: TextField,
    pub custom: Vec<(TextField, TextField)>,

    /// Answer inputs of the current round, by question index.
    pub answers: Vec<TextField>,
    /// Raw text of the round `answers` belong to.
    answers_round: Option<String>,

    pub channel: ChannelState,
    pub readiness: Readiness,

    pub history: Vec<AssessmentRecord>,
    pub history_cursor: usize,
    /// Last recorded assessment of the repository being analysed.
    pub previous: Option<AssessmentRecord>,
    pub help_scroll: u16,
}

impl AppState {
    /// `prefill_url` seeds the public repository field.
    pub fn new(prefill_url: Option<String>) -> Self {
        Self {
            mode: Mode::Normal,
            focus: Focus::RepositoryUrl,
            private: false,
            repository_url: prefill_url.map(TextField::with_value).unwrap_or_default(),
            token: TextField::default(),
            search: TextField::default(),
            browser: RepositoryBrowser::new(),
            env_blob: TextField::default(),
            fields: Default::default(),
            bulk: TextField::default(),
            custom: Vec::new(),
            answers: Vec::new(),
            answers_round: None,
            channel: ChannelState::default(),
            readiness: Readiness::Unknown,
            history: Vec::new(),
            history_cursor: 0,
            previous: None,
            help_scroll: 0,
        }
    }

    /// Focus cycle for the current source mode, custom rows and round.
    pub fn focus_order(&self) -> Vec<Focus> {
        let mut order = if self.private {
            vec![Focus::Token, Focus::Search, Focus::RepositoryList]
        } else {
            vec![Focus::RepositoryUrl]
        };
        order.push(Focus::EnvBlob);
        order.extend((0..FIELD_NAMES.len()).map(Focus::Field));
        order.push(Focus::Bulk);
        for row in 0..self.custom.len() {
            order.push(Focus::CustomKey(row));
            order.push(Focus::CustomValue(row));
        }
        order.extend((0..self.answers.len()).map(Focus::Answer));
        order
    }

    pub fn focus_next(&mut self) {
        self.step_focus(1);
    }

    pub fn focus_prev(&mut self) {
        self.step_focus(-1);
    }

    fn step_focus(&mut self, delta: isize) {
        let order = self.focus_order();
        let len = order.len() as isize;
        self.focus = match order.iter().position(|f| *f == self.focus) {
            Some(i) => order[(i as isize + delta).rem_euclid(len) as usize],
            None => order[0],
        };
    }

    /// Moves focus back into the cycle after it lost its target.
    fn ensure_focus_valid(&mut self) {
        if !self.focus_order().contains(&self.focus) {
            self.focus = self.focus_order()[0];
        }
    }

    /// The text field behind the current focus, if it has one.
    pub fn focused_field_mut(&mut self) -> Option<&mut TextField> {
        match self.focus {
            Focus::RepositoryUrl => Some(&mut self.repository_url),
            Focus::Token => Some(&mut self.token),
            Focus::Search => Some(&mut self.search),
            Focus::RepositoryList => None,
            Focus::EnvBlob => Some(&mut self.env_blob),
            Focus::Field(i) => self.fields.get_mut(i),
            Focus::Bulk => Some(&mut self.bulk),
            Focus::CustomKey(row) => self.custom.get_mut(row).map(|(k, _)| k),
            Focus::CustomValue(row) => self.custom.get_mut(row).map(|(_, v)| v),
            Focus::Answer(i) => self.answers.get_mut(i),
        }
    }

    /// Pushes the search field into the browser filter.
    pub fn apply_search(&mut self) {
        self.browser.set_search(self.search.value());
    }

    pub fn toggle_private(&mut self) {
        self.private = !self.private;
        self.ensure_focus_valid();
    }

    /// Appends an empty custom row and focuses its key.
    pub fn add_custom_row(&mut self) {
        self.custom.push(Default::default());
        self.focus = Focus::CustomKey(self.custom.len() - 1);
    }

    /// Removes the custom row under focus. Returns `false` when focus is not on
    /// a custom row.
    pub fn remove_focused_custom_row(&mut self) -> bool {
        let row = match self.focus {
            Focus::CustomKey(row) | Focus::CustomValue(row) if row < self.custom.len() => row,
            _ => return false,
        };
        self.custom.remove(row);
        self.focus = if self.custom.is_empty() {
            Focus::Bulk
        } else {
            Focus::CustomKey(row.min(self.custom.len() - 1))
        };
        true
    }

    /// Clears the blob, discrete fields and bulk list, and drops all custom rows.
    pub fn clear_environment(&mut self) {
        self.env_blob.clear();
        self.fields.iter_mut().for_each(TextField::clear);
        self.bulk.clear();
        self.custom.clear();
        self.ensure_focus_valid();
    }

    /// The configuration the current form resolves to.
    pub fn environment_config(&self) -> EnvironmentConfig {
        let fields = DiscreteFields {
            database_url: self.fields[0].value().to_owned(),
            db_host: self.fields[1].value().to_owned(),
            db_port: self.fields[2].value().to_owned(),
            secret_key: self.fields[3].value().to_owned(),
            port: self.fields[4].value().to_owned(),
        };
        let custom: Vec<CustomPair> = self
            .custom
            .iter()
            .map(|(k, v)| CustomPair::new(k.value(), v.value()))
            .collect();
        envconfig::resolve(self.env_blob.value(), &fields, self.bulk.value(), &custom)
    }

    /// Builds the start request from the selected source.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NoRepositorySelected`] or
    /// [`ValidationError::MissingCredential`] in private mode. URL checks are
    /// left to the controller.
    pub fn start_request(&self) -> Result<StartRequest, ValidationError> {
        let config = self.environment_config();
        if !self.private {
            return Ok(StartRequest::public(self.repository_url.value(), config));
        }
        let repository = self
            .browser
            .selected()
            .ok_or(ValidationError::NoRepositorySelected)?;
        let token = self.browser.token().ok_or(ValidationError::MissingCredential)?;
        Ok(StartRequest::private(repository.html_url.clone(), token, config))
    }

    /// Matches the answer inputs to the controller's current round.
    ///
    /// A new round gets fresh empty answers and takes focus; no round drops them.
    pub fn sync_round(&mut self, round: Option<&QuestionRound>) {
        let raw = round.map(|r| r.raw.as_str());
        if self.answers_round.as_deref() == raw {
            return;
        }
        self.answers_round = raw.map(str::to_owned);
        match round {
            Some(round) => {
                self.answers = vec![TextField::default(); round.items.len()];
                if !self.answers.is_empty() {
                    self.focus = Focus::Answer(0);
                }
            }
            None => {
                self.answers.clear();
                if self.mode == Mode::Editing && matches!(self.focus, Focus::Answer(_)) {
                    self.mode = Mode::Normal;
                }
                self.ensure_focus_valid();
            }
        }
    }

    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(index).map(TextField::value)
    }

    pub fn show_history(&mut self, records: Vec<AssessmentRecord>) {
        self.history = records;
        self.history_cursor = 0;
        self.mode = Mode::HistoryOverlay;
    }
}
