//! A scripted in-memory engine for exercising the adapters without a database.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::engine::classify;
use crate::engine::{Engine, RawResult, statistics_key};
use crate::error::AdapterError;
use crate::handle::EngineHandle;
use crate::types::{EngineMode, SqlVerb};

/// One canned engine reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Rows(RawResult),
    Affected(u64),
    Error(String),
}

/// Replies still to be handed out, and everything the engine was asked to run.
#[derive(Debug, Default)]
pub struct Script {
    replies: VecDeque<Reply>,
    executed: Vec<String>,
    tables: Vec<String>,
    next_ids: HashMap<String, i64>,
    last_insert_id: i64,
}

impl Script {
    pub fn push(&mut self, reply: Reply) -> &mut Self {
        self.replies.push_back(reply);
        self
    }

    pub fn push_rows(&mut self, rows: RawResult) -> &mut Self {
        self.push(Reply::Rows(rows))
    }

    pub fn push_affected(&mut self, affected: u64) -> &mut Self {
        self.push(Reply::Affected(affected))
    }

    pub fn push_error(&mut self, message: impl Into<String>) -> &mut Self {
        self.push(Reply::Error(message.into()))
    }

    /// Statements run so far, in order.
    #[must_use]
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    #[must_use]
    pub fn last_executed(&self) -> Option<&str> {
        self.executed.last().map(String::as_str)
    }

    pub fn set_tables(&mut self, tables: &[&str]) {
        self.tables = tables.iter().map(|t| (*t).to_owned()).collect();
    }

    pub fn set_last_insert_id(&mut self, id: i64) {
        self.last_insert_id = id;
    }
}

/// Shared view of a [`ScriptedEngine`]'s script, usable after the engine has
/// been moved into an [`EngineHandle`].
pub type ScriptHandle = Rc<RefCell<Script>>;

/// An [`Engine`] that replays queued replies.
///
/// Queries with no queued reply return an empty result; manipulation
/// statements with no queued reply report zero affected rows.
#[derive(Debug)]
pub struct ScriptedEngine {
    script: ScriptHandle,
    open: bool,
    open_failure: Option<String>,
    path: Option<String>,
    charset: String,
    mode: EngineMode,
    extension: String,
    error: Option<String>,
    last_verb: Option<SqlVerb>,
    last_table: Option<String>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Rc::new(RefCell::new(Script::default())),
            open: false,
            open_failure: None,
            path: None,
            charset: "UTF-8".into(),
            mode: EngineMode::default(),
            extension: "db".into(),
            error: None,
            last_verb: None,
            last_table: None,
        }
    }

    /// Make every `open` fail with `message`.
    #[must_use]
    pub fn failing_open(mut self, message: impl Into<String>) -> Self {
        self.open_failure = Some(message.into());
        self
    }

    #[must_use]
    pub fn script(&self) -> ScriptHandle {
        Rc::clone(&self.script)
    }

    /// Move the engine into a fresh handle.
    #[must_use]
    pub fn into_handle(self) -> EngineHandle {
        let slot = RefCell::new(Some(self));
        EngineHandle::new(Box::new(move || {
            slot.borrow_mut()
                .take()
                .map(|engine| Box::new(engine) as Box<dyn Engine>)
                .ok_or_else(|| AdapterError::ConnectionFailure("scripted engine already handed out".into()))
        }))
    }

    /// A handle whose engine can never be loaded.
    #[must_use]
    pub fn unavailable(message: &str) -> EngineHandle {
        let message = message.to_owned();
        EngineHandle::new(Box::new(move || Err(AdapterError::ConnectionFailure(message.clone()))))
    }

    fn begin_call(&mut self, sql: &str) -> Option<Reply> {
        self.error = None;
        self.last_verb = Some(classify::verb_of(sql));
        if let Some(table) = classify::referenced_table(sql) {
            self.last_table = Some(table.to_owned());
        }
        let mut script = self.script.borrow_mut();
        script.executed.push(sql.to_owned());
        script.replies.pop_front()
    }
}

impl Engine for ScriptedEngine {
    fn open(&mut self, path: &str) {
        self.error = None;
        if let Some(message) = &self.open_failure {
            self.error = Some(message.clone());
            return;
        }
        self.open = true;
        self.path = Some(path.to_owned());
    }

    fn terminate(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn query(&mut self, sql: &str) -> Option<RawResult> {
        if !self.open {
            self.error = Some("no database open".into());
            return None;
        }
        let reply = self.begin_call(sql);
        let verb = self.last_verb.unwrap_or(SqlVerb::Other);
        match reply {
            Some(Reply::Error(message)) => {
                self.error = Some(message);
                None
            }
            Some(Reply::Rows(rows)) => Some(rows),
            Some(Reply::Affected(n)) => Some(RawResult::statistics(statistics_key(verb), n)),
            None if self.is_manipulation(sql) => Some(RawResult::statistics(statistics_key(verb), 0)),
            None => Some(RawResult::default()),
        }
    }

    fn exec(&mut self, sql: &str) -> u64 {
        if !self.open {
            self.error = Some("no database open".into());
            return 0;
        }
        match self.begin_call(sql) {
            Some(Reply::Error(message)) => {
                self.error = Some(message);
                0
            }
            Some(Reply::Affected(n)) => n,
            _ => 0,
        }
    }

    fn last_verb(&self) -> Option<SqlVerb> {
        self.last_verb
    }

    fn is_error(&self) -> bool {
        self.error.is_some()
    }

    fn last_error(&self) -> Option<String> {
        self.error.clone()
    }

    fn charset(&self) -> String {
        self.charset.clone()
    }

    fn set_charset(&mut self, charset: &str) {
        self.error = None;
        self.charset = charset.to_owned();
    }

    fn path(&self) -> Option<String> {
        self.path.clone()
    }

    fn set_path(&mut self, path: &str) {
        self.path = Some(path.to_owned());
    }

    fn engine_mode(&self) -> EngineMode {
        self.mode
    }

    fn set_engine_mode(&mut self, mode: EngineMode) {
        self.error = None;
        self.mode = mode;
    }

    fn extension(&self) -> String {
        self.extension.clone()
    }

    fn set_extension(&mut self, extension: &str) {
        self.error = None;
        self.extension = extension.to_owned();
    }

    fn version(&self) -> String {
        "scripted".into()
    }

    fn last_insert_id(&self) -> i64 {
        self.script.borrow().last_insert_id
    }

    fn next_id(&mut self, table: &str) -> i64 {
        self.script.borrow().next_ids.get(table).copied().unwrap_or(1)
    }

    fn set_next_id(&mut self, table: &str, next: i64) -> bool {
        self.script.borrow_mut().next_ids.insert(table.to_owned(), next);
        true
    }

    fn table_name(&self) -> Option<String> {
        self.last_table.clone()
    }

    fn list_tables(&mut self) -> Vec<String> {
        self.script.borrow().tables.clone()
    }
}
