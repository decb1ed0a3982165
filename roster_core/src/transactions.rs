//! Backend-agnostic transaction abstractions modeled after Spring's TransactionTemplate.
//! This module defines only generic types and traits. Backends provide implementations.

use std::time::Duration;

use crate::{RepoError, RepoResult};

/// Transaction isolation level (best-effort across backends).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    Default,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Transaction definition describing desired semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDefinition {
    pub isolation: Isolation,
    pub read_only: bool,
    pub timeout: Option<Duration>,
}

impl Default for TransactionDefinition {
    fn default() -> Self {
        Self {
            isolation: Isolation::Default,
            read_only: false,
            timeout: None,
        }
    }
}

impl TransactionDefinition {
    /// Default definition with writes blocked for the duration of the transaction.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }
}

/// Lifecycle of a storage session.
///
/// `Open -> TransactionActive -> {Committed | RolledBack} -> Closed`. A session can be
/// closed from any state other than `Closed`; closing with a transaction still active
/// leaves the rollback to the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    TransactionActive,
    Committed,
    RolledBack,
    Closed,
}

/// Something that happens to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Begin,
    Commit,
    Rollback,
    Close,
}

impl SessionState {
    /// Apply `event`, returning the next state or [`RepoError::InvalidTransition`].
    pub fn transition(self, event: SessionEvent) -> RepoResult<SessionState> {
        use SessionEvent as E;
        use SessionState as S;
        match (self, event) {
            (S::Open, E::Begin) => Ok(S::TransactionActive),
            (S::TransactionActive, E::Commit) => Ok(S::Committed),
            (S::TransactionActive, E::Rollback) => Ok(S::RolledBack),
            (S::Closed, E::Close) => Err(RepoError::InvalidTransition {
                from: self,
                event,
            }),
            (_, E::Close) => Ok(S::Closed),
            _ => Err(RepoError::InvalidTransition { from: self, event }),
        }
    }

    pub fn is_transaction_active(&self) -> bool {
        matches!(self, SessionState::TransactionActive)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

/// Opaque handle passed inside execute callbacks. Backends define concrete internals.
/// This type is intentionally minimal; it just carries capability to create repos
/// or access underlying connections in backend-specific managers.
#[derive(Debug, Clone, Copy)]
pub struct TransactionContext<'a> {
    _priv: std::marker::PhantomData<&'a ()>,
}

impl<'a> TransactionContext<'a> {
    pub fn new() -> Self {
        Self {
            _priv: std::marker::PhantomData,
        }
    }
}

impl<'a> Default for TransactionContext<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// Backend-implemented transaction manager.
#[async_trait::async_trait]
pub trait TransactionManager: Send + Sync {
    /// Execute the provided async callback within a transactional scope according to
    /// the given definition. Implementations must commit when the callback returns `Ok`,
    /// roll back when it returns `Err`, and release the session on every path.
    async fn execute<'a, R, F, Fut>(&'a self, def: &TransactionDefinition, f: F) -> RepoResult<R>
    where
        F: FnOnce(TransactionContext<'a>) -> Fut + Send + 'a,
        Fut: core::future::Future<Output = RepoResult<R>> + Send + 'a,
        R: Send + 'a;
}

/// Convenience wrapper similar to Spring's TransactionTemplate.
#[derive(Debug)]
pub struct TransactionTemplate<M: TransactionManager> {
    manager: M,
    defaults: TransactionDefinition,
}

impl<M: TransactionManager> TransactionTemplate<M> {
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            defaults: TransactionDefinition::default(),
        }
    }
    pub fn with_defaults(mut self, def: TransactionDefinition) -> Self {
        self.defaults = def;
        self
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub async fn execute<R, F, Fut>(&self, f: F) -> RepoResult<R>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> Fut + Send,
        Fut: core::future::Future<Output = RepoResult<R>> + Send,
        R: Send + 'static,
    {
        self.manager.execute(&self.defaults, f).await
    }

    pub async fn execute_with<R, F, Fut>(&self, def: &TransactionDefinition, f: F) -> RepoResult<R>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> Fut + Send,
        Fut: core::future::Future<Output = RepoResult<R>> + Send,
        R: Send + 'static,
    {
        self.manager.execute(def, f).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the definitions it was asked to run with and mimics commit/rollback.
    #[derive(Default)]
    struct RecordingManager {
        seen: Mutex<Vec<TransactionDefinition>>,
        outcomes: Mutex<Vec<SessionState>>,
    }

    #[async_trait::async_trait]
    impl TransactionManager for RecordingManager {
        async fn execute<'a, R, F, Fut>(
            &'a self,
            def: &TransactionDefinition,
            f: F,
        ) -> RepoResult<R>
        where
            F: FnOnce(TransactionContext<'a>) -> Fut + Send + 'a,
            Fut: core::future::Future<Output = RepoResult<R>> + Send + 'a,
            R: Send + 'a,
        {
            self.seen.lock().unwrap().push(def.clone());
            let state = SessionState::Open.transition(SessionEvent::Begin)?;
            let result = f(TransactionContext::new()).await;
            let end = match &result {
                Ok(_) => state.transition(SessionEvent::Commit)?,
                Err(_) => state.transition(SessionEvent::Rollback)?,
            };
            self.outcomes.lock().unwrap().push(end);
            result
        }
    }

    #[test]
    fn template_delegates_to_manager_and_returns_value() {
        let tpl = TransactionTemplate::new(RecordingManager::default());
        let fut = tpl.execute(|_ctx| async move { Ok::<_, RepoError>(41 + 1) });
        let out = futures::executor::block_on(fut).unwrap();
        assert_eq!(out, 42);
        assert_eq!(
            tpl.manager().outcomes.lock().unwrap().as_slice(),
            &[SessionState::Committed]
        );
    }

    #[test]
    fn template_reports_rollback_on_error() {
        let tpl = TransactionTemplate::new(RecordingManager::default());
        let fut = tpl.execute(|_ctx| async move {
            Err::<(), _>(RepoError::backend(std::io::Error::new(
                std::io::ErrorKind::Other,
                "boom",
            )))
        });
        assert!(futures::executor::block_on(fut).is_err());
        assert_eq!(
            tpl.manager().outcomes.lock().unwrap().as_slice(),
            &[SessionState::RolledBack]
        );
    }

    #[test]
    fn template_with_defaults_overrides_definition() {
        let expected = TransactionDefinition {
            isolation: Isolation::Serializable,
            read_only: true,
            timeout: Some(Duration::from_secs(1)),
        };
        let tpl = TransactionTemplate::new(RecordingManager::default()).with_defaults(expected.clone());
        let fut = tpl.execute(|_ctx| async move { Ok::<_, RepoError>(123) });
        assert_eq!(futures::executor::block_on(fut).unwrap(), 123);
        assert_eq!(tpl.manager().seen.lock().unwrap().as_slice(), &[expected]);
    }

    #[test]
    fn template_execute_with_uses_provided_definition() {
        let provided = TransactionDefinition::read_only();
        let tpl = TransactionTemplate::new(RecordingManager::default());
        let fut = tpl.execute_with(&provided, |_ctx| async move { Ok::<_, RepoError>(7 * 6) });
        assert_eq!(futures::executor::block_on(fut).unwrap(), 42);
        let seen = tpl.manager().seen.lock().unwrap();
        assert!(seen[0].read_only);
        assert_eq!(seen[0].isolation, Isolation::Default);
    }

    #[test]
    fn definition_defaults() {
        let def = TransactionDefinition::default();
        assert_eq!(def.isolation, Isolation::Default);
        assert!(!def.read_only);
        assert!(def.timeout.is_none());
    }

    #[test]
    fn session_state_happy_paths() {
        let s = SessionState::Open;
        let s = s.transition(SessionEvent::Begin).unwrap();
        assert!(s.is_transaction_active());
        let committed = s.transition(SessionEvent::Commit).unwrap();
        assert_eq!(committed, SessionState::Committed);
        assert!(committed.transition(SessionEvent::Close).unwrap().is_closed());

        let rolled = s.transition(SessionEvent::Rollback).unwrap();
        assert_eq!(rolled, SessionState::RolledBack);
        assert!(rolled.transition(SessionEvent::Close).unwrap().is_closed());
    }

    #[test]
    fn session_state_rejects_invalid_edges() {
        let invalid = [
            (SessionState::Open, SessionEvent::Commit),
            (SessionState::Open, SessionEvent::Rollback),
            (SessionState::TransactionActive, SessionEvent::Begin),
            (SessionState::Committed, SessionEvent::Begin),
            (SessionState::Committed, SessionEvent::Rollback),
            (SessionState::RolledBack, SessionEvent::Commit),
            (SessionState::Closed, SessionEvent::Begin),
            (SessionState::Closed, SessionEvent::Close),
        ];
        for (from, event) in invalid {
            let err = from.transition(event).unwrap_err();
            assert!(
                matches!(err, RepoError::InvalidTransition { from: f, event: e } if f == from && e == event),
                "{:?} --{:?}--> should be rejected",
                from,
                event
            );
        }
    }

    #[test]
    fn closing_an_active_transaction_is_allowed() {
        let s = SessionState::TransactionActive
            .transition(SessionEvent::Close)
            .unwrap();
        assert!(s.is_closed());
        assert!(SessionState::Open
            .transition(SessionEvent::Close)
            .unwrap()
            .is_closed());
    }
}
