//! Session and token handling
//!
//! Tokens are issued by the external auth service. The client only keeps
//! them behind a [`TokenStore`] capability, attaches them to requests and
//! tears them down on logout or when the API answers 401.

use crate::core::entity::{AuthGrant, Credentials, User};
use crate::core::error::TracexResult;
use crate::core::events::{ClientEvent, EventBus};
use crate::core::service::AuthService;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Storage capability for the bearer token
pub trait TokenStore: Send + Sync {
    fn get_token(&self) -> Option<String>;

    fn set_token(&self, token: &str);

    fn clear_token(&self);
}

/// Process-local token store
#[derive(Debug, Default, Clone)]
pub struct InMemoryTokenStore {
    token: Arc<RwLock<Option<String>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token, as if loaded from disk
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
        }
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_token(&self, token: &str) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.to_string());
    }

    fn clear_token(&self) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

/// Where the session stands
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Restoring from a stored token
    Loading,
    Anonymous,
    Authenticated(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// The signed-in user and its token
///
/// Lifecycle: [`restore`](Session::restore) on load, [`establish`](Session::establish)
/// after sign-in, [`logout`](Session::logout) on teardown.
pub struct Session {
    auth: Arc<dyn AuthService>,
    tokens: Arc<dyn TokenStore>,
    state: RwLock<SessionState>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(auth: Arc<dyn AuthService>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            auth,
            tokens,
            state: RwLock::new(SessionState::Loading),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state().user().cloned()
    }

    fn set_state(&self, state: SessionState) {
        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    /// Resume from a stored token
    ///
    /// Without a token the session is anonymous. A token the API no longer
    /// accepts is cleared.
    pub async fn restore(&self) -> Option<User> {
        if self.tokens.get_token().is_none() {
            self.set_state(SessionState::Anonymous);
            return None;
        }
        match self.auth.me().await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "session restored");
                self.set_state(SessionState::Authenticated(user.clone()));
                Some(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored token rejected, clearing session");
                self.tokens.clear_token();
                self.set_state(SessionState::Anonymous);
                None
            }
        }
    }

    /// Store the token and user from a sign-in or sign-up
    pub fn establish(&self, grant: AuthGrant) -> User {
        self.tokens.set_token(&grant.token);
        self.set_state(SessionState::Authenticated(grant.user.clone()));
        tracing::info!(user_id = %grant.user.id, "session established");
        grant.user
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> TracexResult<User> {
        credentials.validate_sign_in()?;
        let grant = self.auth.sign_in(credentials).await?;
        Ok(self.establish(grant))
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> TracexResult<User> {
        credentials.validate_sign_up()?;
        let grant = self.auth.sign_up(credentials).await?;
        Ok(self.establish(grant))
    }

    /// Replace the cached user after a profile change
    pub fn update_user(&self, user: User) {
        if self.state().is_authenticated() {
            self.set_state(SessionState::Authenticated(user));
        }
    }

    pub fn logout(&self) {
        self.tokens.clear_token();
        self.set_state(SessionState::Anonymous);
        tracing::info!("session closed");
    }

    /// Drop to anonymous whenever the API reports an expired session
    ///
    /// The task ends when the session is dropped or the bus closes.
    pub fn watch_expiry(self: &Arc<Self>, events: &EventBus) -> JoinHandle<()> {
        let session: Weak<Session> = Arc::downgrade(self);
        let mut rx = events.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) if envelope.event == ClientEvent::SessionExpired => {
                        let Some(session) = session.upgrade() else {
                            break;
                        };
                        session.logout();
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        if session.strong_count() == 0 {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ApiError, TracexError};
    use async_trait::async_trait;

    struct FakeAuth {
        accept: bool,
    }

    fn user() -> User {
        User {
            id: "u1".to_string(),
            email: "ana@example.com".to_string(),
            name: None,
            currency: None,
            webhook_url: None,
        }
    }

    #[async_trait]
    impl AuthService for FakeAuth {
        async fn sign_in(&self, _: &Credentials) -> TracexResult<AuthGrant> {
            Ok(AuthGrant {
                user: user(),
                token: "tok".to_string(),
            })
        }

        async fn sign_up(&self, credentials: &Credentials) -> TracexResult<AuthGrant> {
            self.sign_in(credentials).await
        }

        async fn me(&self) -> TracexResult<User> {
            if self.accept {
                Ok(user())
            } else {
                Err(TracexError::Api(ApiError::Unauthorized {
                    message: "Unauthorized".to_string(),
                }))
            }
        }

        async fn change_password(&self, _: &str, _: &str) -> TracexResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_in_memory_token_store() {
        let store = InMemoryTokenStore::new();
        assert_eq!(store.get_token(), None);
        store.set_token("abc");
        assert_eq!(store.get_token().as_deref(), Some("abc"));
        store.clear_token();
        assert_eq!(store.get_token(), None);
    }

    #[tokio::test]
    async fn test_restore_without_token_is_anonymous() {
        let session = Session::new(
            Arc::new(FakeAuth { accept: true }),
            Arc::new(InMemoryTokenStore::new()),
        );
        assert_eq!(session.state(), SessionState::Loading);
        assert_eq!(session.restore().await, None);
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_restore_with_rejected_token_clears_it() {
        let tokens = Arc::new(InMemoryTokenStore::with_token("stale"));
        let session = Session::new(Arc::new(FakeAuth { accept: false }), tokens.clone());
        assert_eq!(session.restore().await, None);
        assert_eq!(tokens.get_token(), None);
    }

    #[tokio::test]
    async fn test_sign_in_then_logout() {
        let tokens = Arc::new(InMemoryTokenStore::new());
        let session = Session::new(Arc::new(FakeAuth { accept: true }), tokens.clone());

        let signed_in = session
            .sign_in(&Credentials::new("ana@example.com", "secret"))
            .await
            .unwrap();
        assert_eq!(signed_in.id, "u1");
        assert_eq!(tokens.get_token().as_deref(), Some("tok"));
        assert!(session.state().is_authenticated());

        session.logout();
        assert_eq!(tokens.get_token(), None);
        assert_eq!(session.current_user(), None);
    }

    #[tokio::test]
    async fn test_sign_in_validates_locally() {
        let session = Session::new(
            Arc::new(FakeAuth { accept: true }),
            Arc::new(InMemoryTokenStore::new()),
        );
        let err = session
            .sign_in(&Credentials::new("not-an-email", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, TracexError::Validation(_)));
    }

    #[tokio::test]
    async fn test_session_expired_event_logs_out() {
        let tokens = Arc::new(InMemoryTokenStore::new());
        let session = Arc::new(Session::new(Arc::new(FakeAuth { accept: true }), tokens));
        session
            .sign_in(&Credentials::new("ana@example.com", "secret"))
            .await
            .unwrap();

        let bus = EventBus::new(8);
        let _watcher = session.watch_expiry(&bus);
        bus.publish(ClientEvent::SessionExpired);

        for _ in 0..50 {
            if !session.state().is_authenticated() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(session.state(), SessionState::Anonymous);
    }
}
