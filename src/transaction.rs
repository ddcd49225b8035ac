use tracing::{debug, warn};

use crate::dispatch;
use crate::error::AdapterError;
use crate::handle::EngineHandle;

const BEGIN: &str = "BEGIN";
const COMMIT: &str = "COMMIT";
const ROLLBACK: &str = "ROLLBACK";

pub const SAVEPOINTS_UNSUPPORTED: &str = "savepoints unsupported";
pub const NO_ACTIVE_TRANSACTION: &str = "no active transaction, changes are auto-committed";

/// Translates begin/commit/rollback into the engine's literal statements.
///
/// The engine knows a single flat transaction per connection. The state kept
/// here is the adapter's own bookkeeping, one per facade instance. It records
/// the handle session BEGIN ran in, so a transaction lost when another facade
/// terminated or reopened the shared engine no longer counts as open.
#[derive(Debug, Default)]
pub struct TransactionBridge {
    session: Option<u64>,
}

fn reject_savepoint(savepoint: Option<&str>) -> Result<(), AdapterError> {
    match savepoint {
        Some(name) if !name.is_empty() => {
            Err(AdapterError::UnsupportedFeature(SAVEPOINTS_UNSUPPORTED.into()))
        }
        _ => Ok(()),
    }
}

impl TransactionBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transaction begun here is still open on `handle`'s session.
    #[must_use]
    pub fn in_transaction(&self, handle: &EngineHandle) -> bool {
        self.session.is_some() && self.session == handle.session()
    }

    fn drop_stale(&mut self, handle: &EngineHandle) {
        if self.session.is_some() && !self.in_transaction(handle) {
            debug!(
                began_in = ?self.session,
                now = ?handle.session(),
                "transaction lost with its session"
            );
            self.session = None;
        }
    }

    /// Open a transaction. Beginning twice is a successful no-op.
    ///
    /// # Errors
    /// `UnsupportedFeature` for any savepoint name; otherwise whatever the
    /// engine reports for BEGIN.
    pub fn begin(
        &mut self,
        handle: &mut EngineHandle,
        savepoint: Option<&str>,
    ) -> Result<(), AdapterError> {
        reject_savepoint(savepoint)?;
        self.drop_stale(handle);
        if self.session.is_some() {
            debug!("transaction already open");
            return Ok(());
        }
        dispatch::execute_control(handle, BEGIN)?;
        self.session = handle.session();
        Ok(())
    }

    /// Commit the open transaction.
    ///
    /// # Errors
    /// `UnsupportedFeature` for a savepoint name, `InvalidTransactionState`
    /// when no transaction is open, or the engine's COMMIT failure.
    pub fn commit(
        &mut self,
        handle: &mut EngineHandle,
        savepoint: Option<&str>,
    ) -> Result<(), AdapterError> {
        self.finish(handle, savepoint, COMMIT)
    }

    /// Roll back the open transaction.
    ///
    /// # Errors
    /// Same as [`TransactionBridge::commit`].
    pub fn rollback(
        &mut self,
        handle: &mut EngineHandle,
        savepoint: Option<&str>,
    ) -> Result<(), AdapterError> {
        self.finish(handle, savepoint, ROLLBACK)
    }

    fn finish(
        &mut self,
        handle: &mut EngineHandle,
        savepoint: Option<&str>,
        statement: &str,
    ) -> Result<(), AdapterError> {
        reject_savepoint(savepoint)?;
        self.drop_stale(handle);
        if self.session.is_none() {
            return Err(AdapterError::InvalidTransactionState(NO_ACTIVE_TRANSACTION.into()));
        }
        dispatch::execute_control(handle, statement)?;
        self.session = None;
        Ok(())
    }

    /// Roll back and forget an open transaction, e.g. on disconnect.
    ///
    /// A failing ROLLBACK is logged, not returned: the state is closed either
    /// way. Returns whether a transaction was open on the current session.
    pub fn abandon(&mut self, handle: &mut EngineHandle) -> bool {
        self.drop_stale(handle);
        if self.session.take().is_none() {
            return false;
        }
        warn!("open transaction abandoned, rolling back");
        if let Err(e) = dispatch::execute_control(handle, ROLLBACK) {
            warn!(error = %e, "rollback of abandoned transaction failed");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::ScriptedEngine;

    fn connected() -> Result<EngineHandle, AdapterError> {
        let mut handle = ScriptedEngine::new().into_handle();
        handle.open("test")?;
        Ok(handle)
    }

    #[test]
    fn begin_is_idempotent() -> Result<(), AdapterError> {
        let mut handle = connected()?;
        let mut tx = TransactionBridge::new();
        tx.begin(&mut handle, None)?;
        tx.begin(&mut handle, Some(""))?;
        assert!(tx.in_transaction(&handle));
        tx.commit(&mut handle, None)?;
        assert!(!tx.in_transaction(&handle));
        Ok(())
    }

    #[test]
    fn savepoints_always_fail() -> Result<(), AdapterError> {
        let mut handle = connected()?;
        let mut tx = TransactionBridge::new();
        let err = tx.begin(&mut handle, Some("sp1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
        assert_eq!(err.message(), SAVEPOINTS_UNSUPPORTED);

        tx.begin(&mut handle, None)?;
        let err = tx.begin(&mut handle, Some("sp1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
        let err = tx.rollback(&mut handle, Some("sp1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
        assert!(tx.in_transaction(&handle));
        Ok(())
    }

    #[test]
    fn commit_without_begin_fails() -> Result<(), AdapterError> {
        let mut handle = connected()?;
        let mut tx = TransactionBridge::new();
        let err = tx.commit(&mut handle, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransactionState);
        assert_eq!(err.message(), NO_ACTIVE_TRANSACTION);
        let err = tx.rollback(&mut handle, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransactionState);
        Ok(())
    }

    #[test]
    fn abandon_rolls_back_open_transactions() -> Result<(), AdapterError> {
        let engine = ScriptedEngine::new();
        let script = engine.script();
        let mut handle = engine.into_handle();
        handle.open("test")?;
        let mut tx = TransactionBridge::new();
        assert!(!tx.abandon(&mut handle));
        tx.begin(&mut handle, None)?;
        assert!(tx.abandon(&mut handle));
        assert!(!tx.in_transaction(&handle));
        assert_eq!(script.borrow().executed(), ["BEGIN", "ROLLBACK"]);
        Ok(())
    }

    #[test]
    fn reopened_session_forgets_the_transaction() -> Result<(), AdapterError> {
        let engine = ScriptedEngine::new();
        let script = engine.script();
        let mut handle = engine.into_handle();
        handle.open("test")?;
        let mut tx = TransactionBridge::new();
        tx.begin(&mut handle, None)?;

        handle.terminate();
        handle.open("test")?;
        assert!(!tx.in_transaction(&handle));
        let err = tx.rollback(&mut handle, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransactionState);

        tx.begin(&mut handle, None)?;
        assert!(tx.in_transaction(&handle));
        assert_eq!(script.borrow().executed(), ["BEGIN", "BEGIN"]);
        Ok(())
    }

    #[test]
    fn failed_begin_leaves_state_closed() {
        let mut handle = ScriptedEngine::new().into_handle();
        let mut tx = TransactionBridge::new();
        let err = tx.begin(&mut handle, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailure);
        assert!(!tx.in_transaction(&handle));
    }
}
