use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::dispatch::QueryStats;
use crate::engine::Engine;
use crate::error::AdapterError;
use crate::statement::Statement;
use crate::translate;

/// The one engine handle, shared by every facade that was given it.
///
/// Access is single-threaded and unsynchronised: callers serialise requests
/// themselves, exactly as a host's request lifecycle does.
pub type SharedEngine = Rc<RefCell<EngineHandle>>;

/// Builds the engine on first use.
pub type EngineFactory = Box<dyn Fn() -> Result<Box<dyn Engine>, AdapterError>>;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Owns the single engine instance and the state every facade shares with it.
///
/// Besides the engine this holds the single "current" [`Statement`] slot and
/// the [`QueryStats`] of the last manipulation statement. Starting a new
/// statement replaces the slot unconditionally: a result handle obtained
/// earlier, by this or any other facade sharing the handle, then reads the new
/// statement. Handles expose [`Statement::generation`] comparisons so callers
/// can detect this, but nothing prevents it.
pub struct EngineHandle {
    factory: EngineFactory,
    engine: Option<Box<dyn Engine>>,
    connection_id: Option<u64>,
    alive: bool,
    pub(crate) current: Option<Statement>,
    pub(crate) stats: QueryStats,
    generation: u64,
    session: u64,
}

impl EngineHandle {
    /// A handle whose engine is built lazily by `factory`.
    #[must_use]
    pub fn new(factory: EngineFactory) -> Self {
        Self {
            factory,
            engine: None,
            connection_id: None,
            alive: false,
            current: None,
            stats: QueryStats::default(),
            generation: 0,
            session: 0,
        }
    }

    /// A handle backed by [`crate::engine::SqliteEngine`].
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlite() -> Self {
        Self::new(Box::new(|| {
            Ok(Box::new(crate::engine::SqliteEngine::new()) as Box<dyn Engine>)
        }))
    }

    /// Wrap this handle for sharing between facades.
    #[must_use]
    pub fn into_shared(self) -> SharedEngine {
        Rc::new(RefCell::new(self))
    }

    /// Return the engine, creating it on the first call.
    ///
    /// # Errors
    /// Returns `AdapterError::ConnectionFailure` if the engine cannot be created.
    pub fn acquire(&mut self) -> Result<&mut dyn Engine, AdapterError> {
        if self.engine.is_none() {
            let engine = (self.factory)().map_err(|e| match e {
                AdapterError::ConnectionFailure(_) => e,
                other => AdapterError::ConnectionFailure(format!(
                    "engine could not be loaded: {}",
                    other.message()
                )),
            })?;
            let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
            debug!(connection_id = id, "engine instance created");
            self.engine = Some(engine);
            self.connection_id = Some(id);
        }
        match self.engine.as_deref_mut() {
            Some(engine) => Ok(engine),
            None => Err(AdapterError::ConnectionFailure("engine could not be loaded".into())),
        }
    }

    /// Bind the engine to a database file.
    ///
    /// Re-opening the path the handle is already bound to is a no-op.
    ///
    /// # Errors
    /// Returns `AdapterError::ConnectionFailure` if the engine cannot be created
    /// or reports a failure opening `path`.
    pub fn open(&mut self, path: &str) -> Result<(), AdapterError> {
        if self.alive && self.is_bound_to(path) {
            return Ok(());
        }
        self.alive = false;
        self.current = None;
        self.stats.clear();
        let engine = self.acquire()?;
        if engine.is_open() {
            engine.terminate();
        }
        engine.open(path);
        translate::check_connection(engine)?;
        self.alive = true;
        self.session += 1;
        info!(connection_id = ?self.connection_id, session = self.session, path, "engine opened");
        Ok(())
    }

    fn is_bound_to(&self, path: &str) -> bool {
        let Some(engine) = self.engine.as_deref() else {
            return false;
        };
        let Some(bound) = engine.path() else {
            return false;
        };
        let suffix = format!(".{}", engine.extension());
        bound == path || bound.strip_suffix(suffix.as_str()) == Some(path)
    }

    /// Whether `open` succeeded and no `terminate` has been issued since.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Release the database and forget the current statement and statistics.
    ///
    /// Calling it again is a no-op.
    pub fn terminate(&mut self) {
        if !self.alive {
            return;
        }
        if let Some(engine) = self.engine.as_deref_mut() {
            engine.terminate();
        }
        self.alive = false;
        self.current = None;
        self.stats.clear();
        info!(connection_id = ?self.connection_id, "engine terminated");
    }

    /// Opaque id of the engine instance, once it exists.
    #[must_use]
    pub fn connection_id(&self) -> Option<u64> {
        self.connection_id
    }

    /// Counter of successful opens while the handle is alive, `None` otherwise.
    ///
    /// Engine-side state such as an open transaction belongs to one session
    /// and is gone once the session changes.
    #[must_use]
    pub fn session(&self) -> Option<u64> {
        self.alive.then_some(self.session)
    }

    /// The engine of a live handle.
    ///
    /// # Errors
    /// Returns `AdapterError::ConnectionFailure` when not connected; no lazy
    /// connect is attempted.
    pub fn engine(&self) -> Result<&dyn Engine, AdapterError> {
        match self.engine.as_deref() {
            Some(engine) if self.alive => Ok(engine),
            _ => Err(AdapterError::not_connected()),
        }
    }

    /// Mutable access to the engine of a live handle.
    ///
    /// # Errors
    /// Returns `AdapterError::ConnectionFailure` when not connected.
    pub fn engine_mut(&mut self) -> Result<&mut dyn Engine, AdapterError> {
        match self.engine.as_deref_mut() {
            Some(engine) if self.alive => Ok(engine),
            _ => Err(AdapterError::not_connected()),
        }
    }

    /// The statement most recently executed through this handle.
    #[must_use]
    pub fn current(&self) -> Option<&Statement> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Statement> {
        self.current.as_mut()
    }

    /// Drop the current statement and its statistics.
    pub fn clear_current(&mut self) {
        self.current = None;
        self.stats.clear();
    }

    /// Statistics of the last manipulation statement.
    #[must_use]
    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    /// Generation the next statement will carry.
    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Generation of the statement currently in the slot, 0 if none.
    #[must_use]
    pub fn current_generation(&self) -> u64 {
        self.current.as_ref().map_or(0, Statement::generation)
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("connection_id", &self.connection_id)
            .field("alive", &self.alive)
            .field("has_statement", &self.current.is_some())
            .finish()
    }
}
