//! Session provider: the signed-in identity joined with its profile.
//!
//! A [`SessionProvider`] is built once with [`SessionProvider::initialize`],
//! handed by reference to whatever needs the session, and released with
//! [`SessionProvider::teardown`]. Profiles are only ever loaded in response
//! to an identity notification, so a profile-dependent fetch can never run
//! ahead of the auth state it depends on.

use crate::config::SessionOptions;
use crate::error::{Error, Result};
use crate::identity::IdentityService;
use crate::store::{self, DocumentStore, USERS};
use crate::types::{AuthUser, CreateUserRequest, Role, SessionUser, UserProfile};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    SignedOut,
    SigningIn,
    /// Signed in, but no profile document exists (yet) for this identity.
    SignedInNoProfile(AuthUser),
    Ready(SessionUser),
    Error(String),
}

impl SessionState {
    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            SessionState::Ready(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready(_))
    }

    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(SessionUser::is_admin)
    }

    pub fn require_user(&self) -> Result<&SessionUser> {
        match self {
            SessionState::Ready(user) => Ok(user),
            SessionState::SignedInNoProfile(_) => Err(Error::ProfileNotLoaded),
            _ => Err(Error::NotSignedIn),
        }
    }

    pub fn require_admin(&self) -> Result<&SessionUser> {
        let user = self.require_user()?;
        if user.is_admin() {
            Ok(user)
        } else {
            Err(Error::Forbidden)
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SessionState::SignedOut => "signed-out",
            SessionState::SigningIn => "signing-in",
            SessionState::SignedInNoProfile(_) => "signed-in-no-profile",
            SessionState::Ready(_) => "ready",
            SessionState::Error(_) => "error",
        }
    }
}

pub struct SessionProvider<I, S> {
    identity: I,
    store: S,
    options: SessionOptions,
    auth_changes: watch::Receiver<Option<AuthUser>>,
    state: watch::Sender<SessionState>,
}

impl<I, S> SessionProvider<I, S>
where
    I: IdentityService,
    S: DocumentStore,
{
    /// Subscribe to `identity` and load the profile of any user already signed in.
    pub async fn initialize(identity: I, store: S, options: SessionOptions) -> Self {
        let mut auth_changes = identity.subscribe();
        let current = auth_changes.borrow_and_update().clone();
        let (state, _) = watch::channel(SessionState::SignedOut);

        let mut provider = Self {
            identity,
            store,
            options,
            auth_changes,
            state,
        };
        if let Err(e) = provider.apply(current).await {
            tracing::error!("Failed to restore session: {}", e);
        }
        provider
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn publish(&self, next: SessionState) {
        tracing::info!("Session state: {}", next.label());
        self.state.send_replace(next);
    }

    /// Apply the latest identity notification, if one arrived since the last call.
    pub async fn sync(&mut self) -> Result<()> {
        if !self.auth_changes.has_changed().unwrap_or(false) {
            return Ok(());
        }
        let user = self.auth_changes.borrow_and_update().clone();
        self.apply(user).await
    }

    async fn apply(&mut self, user: Option<AuthUser>) -> Result<()> {
        let Some(user) = user else {
            self.publish(SessionState::SignedOut);
            return Ok(());
        };

        self.publish(SessionState::SignedInNoProfile(user.clone()));
        match self.load_profile(&user).await {
            Ok(Some(profile)) => {
                self.publish(SessionState::Ready(SessionUser::from_profile(&user.uid, profile)));
                Ok(())
            }
            Ok(None) => {
                tracing::info!("No profile yet for {}", user.email);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load profile for {}: {}", user.email, e);
                self.publish(SessionState::Error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn load_profile(&self, user: &AuthUser) -> Result<Option<UserProfile>> {
        if let Some(profile) = store::read::<UserProfile, _>(&self.store, USERS, &user.uid).await? {
            return Ok(Some(profile));
        }
        if !self.is_bootstrap_admin(&user.email) {
            return Ok(None);
        }

        tracing::warn!("Bootstrapping admin profile for {}", user.email);
        let profile = UserProfile {
            email: user.email.clone(),
            role: Role::Admin,
            name: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        store::write(&self.store, USERS, &user.uid, &profile).await?;
        Ok(Some(profile))
    }

    fn is_bootstrap_admin(&self, email: &str) -> bool {
        self.options
            .bootstrap_admin_email
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(email))
    }

    /// Sign in; a vendor failure is returned as-is in [`Error::Vendor`].
    ///
    /// A failed attempt while another user is still signed in leaves that
    /// session as it was.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<SessionState> {
        let previous = self.state();
        self.publish(SessionState::SigningIn);

        if let Err(e) = self.identity.sign_in(email, password).await {
            tracing::error!("Login failed for {}: {}", email, e);
            if self.identity.current_user().is_some() {
                self.publish(previous);
            } else {
                self.publish(SessionState::Error(e.to_string()));
            }
            return Err(e.into());
        }

        self.sync().await?;
        Ok(self.state())
    }

    pub async fn logout(&mut self) -> Result<()> {
        self.identity.sign_out().await?;

        // The sign-out notification is handled right here
        self.auth_changes.mark_unchanged();
        self.publish(SessionState::SignedOut);
        Ok(())
    }

    /// Create an account and its profile without touching the active session.
    ///
    /// The work runs on an isolated identity instance which is always
    /// disposed before returning; a disposal failure is logged and never
    /// replaces the outcome of the creation itself.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<SessionUser> {
        let admin_uid = self.state.borrow().require_admin()?.uid.clone();

        let instance = format!("create-user-{}", uuid::Uuid::new_v4());
        let secondary = self.identity.isolated(&instance)?;

        let outcome = self.provision(&secondary, &request).await;

        if let Err(e) = secondary.dispose().await {
            tracing::warn!("Failed to tear down identity instance {}: {}", instance, e);
        }

        match &outcome {
            Ok(user) => tracing::info!("User {} created by {}", user.email, admin_uid),
            Err(e) => tracing::error!("Failed to create user {}: {}", request.email, e),
        }
        outcome
    }

    async fn provision(&self, secondary: &I, request: &CreateUserRequest) -> Result<SessionUser> {
        let user = secondary
            .create_account(&request.email, &request.password)
            .await?;

        let profile = UserProfile {
            email: request.email.clone(),
            role: request.role,
            name: request.name.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        store::write(&self.store, USERS, &user.uid, &profile).await?;

        secondary.sign_out().await?;
        Ok(SessionUser::from_profile(&user.uid, profile))
    }

    /// Release the identity subscription and publish a final signed-out state.
    pub fn teardown(self) {
        let Self {
            auth_changes,
            state,
            ..
        } = self;
        drop(auth_changes);
        state.send_replace(SessionState::SignedOut);
        tracing::info!("Session provider torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, VendorError};
    use crate::identity::{IdentityOp, MemoryIdentity};
    use crate::store::{MemoryStore, StoreOp};
    use serde_json::json;

    async fn seed_profile(store: &MemoryStore, uid: &str, email: &str, role: &str) {
        store
            .set(
                USERS,
                uid,
                json!({"email": email, "role": role, "name": "Seed", "createdAt": "2024-01-01T00:00:00Z"}),
            )
            .await
            .unwrap();
    }

    async fn admin_session() -> (MemoryIdentity, MemoryStore, SessionProvider<MemoryIdentity, MemoryStore>) {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let admin = identity.register("admin@example.com", "secret1");
        seed_profile(&store, &admin.uid, "admin@example.com", "admin").await;

        let mut session =
            SessionProvider::initialize(identity.clone(), store.clone(), SessionOptions::default()).await;
        session.login("admin@example.com", "secret1").await.unwrap();
        (identity, store, session)
    }

    fn request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            password: "secret2".to_string(),
            role: Role::Client,
            name: Some("Cliente".to_string()),
        }
    }

    #[tokio::test]
    async fn test_login_loads_profile() {
        let (_, _, session) = admin_session().await;
        let state = session.state();
        let user = state.user().unwrap();
        assert_eq!(user.email, "admin@example.com");
        assert_eq!(user.role, Role::Admin);
        assert!(state.is_admin());
    }

    #[tokio::test]
    async fn test_login_failure_propagates_vendor_error() {
        let identity = MemoryIdentity::new();
        identity.register("ana@example.com", "secret1");
        let mut session =
            SessionProvider::initialize(identity, MemoryStore::new(), SessionOptions::default()).await;

        let err = session.login("ana@example.com", "wrong").await.unwrap_err();
        match err {
            Error::Vendor(vendor) => assert_eq!(vendor.code, ErrorCode::InvalidCredentials),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(session.state(), SessionState::Error(_)));
    }

    #[tokio::test]
    async fn test_failed_relogin_keeps_active_session() {
        let (identity, store, mut session) = admin_session().await;

        let err = session.login("admin@example.com", "typo").await.unwrap_err();
        assert!(matches!(err, Error::Vendor(ref vendor) if vendor.code == ErrorCode::InvalidCredentials));
        assert_eq!(identity.current_user().unwrap().email, "admin@example.com");
        assert!(session.state().is_admin());

        session.sync().await.unwrap();
        assert!(session.state().is_admin());
        assert!(matches!(
            crate::clients::load_clients(&session.state(), &store).await,
            crate::clients::ClientChoice::Options(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_profile_is_distinct_state() {
        let identity = MemoryIdentity::new();
        let user = identity.register("ana@example.com", "secret1");
        let mut session =
            SessionProvider::initialize(identity, MemoryStore::new(), SessionOptions::default()).await;

        let state = session.login("ana@example.com", "secret1").await.unwrap();
        assert_eq!(state, SessionState::SignedInNoProfile(user));
        assert!(matches!(state.require_user(), Err(Error::ProfileNotLoaded)));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_profile() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let user = identity.register("owner@example.com", "secret1");
        let options = SessionOptions {
            bootstrap_admin_email: Some("Owner@Example.com".to_string()),
        };
        let mut session = SessionProvider::initialize(identity, store.clone(), options).await;

        let state = session.login("owner@example.com", "secret1").await.unwrap();
        assert!(state.is_admin());

        let stored = store.get(USERS, &user.uid).await.unwrap().unwrap();
        assert_eq!(stored["role"], "admin");
    }

    #[tokio::test]
    async fn test_initialize_restores_signed_in_user() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let user = identity.register("ana@example.com", "secret1");
        seed_profile(&store, &user.uid, "ana@example.com", "client").await;
        identity.sign_in("ana@example.com", "secret1").await.unwrap();

        let session = SessionProvider::initialize(identity, store, SessionOptions::default()).await;
        let state = session.state();
        assert_eq!(state.user().unwrap().role, Role::Client);
        assert!(matches!(state.require_admin(), Err(Error::Forbidden)));
    }

    #[tokio::test]
    async fn test_logout_clears_profile() {
        let (identity, _, mut session) = admin_session().await;
        let mut states = session.subscribe();

        session.logout().await.unwrap();
        assert_eq!(session.state(), SessionState::SignedOut);
        assert!(identity.current_user().is_none());
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn test_sync_follows_external_sign_out() {
        let (identity, _, mut session) = admin_session().await;
        identity.sign_out().await.unwrap();
        assert!(session.state().is_ready());

        session.sync().await.unwrap();
        assert_eq!(session.state(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn test_create_user_keeps_active_session() {
        let (identity, store, session) = admin_session().await;
        let before = identity.current_user();

        let created = session.create_user(request("cliente@example.com")).await.unwrap();
        assert_eq!(created.role, Role::Client);
        assert_eq!(created.name.as_deref(), Some("Cliente"));

        assert_eq!(identity.current_user(), before);
        assert!(session.state().is_admin());
        assert_eq!(identity.isolated_created(), 1);
        assert_eq!(identity.dispose_attempts(), 1);

        let stored = store.get(USERS, &created.uid).await.unwrap().unwrap();
        assert_eq!(stored["role"], "client");
        assert_eq!(stored["email"], "cliente@example.com");
    }

    #[tokio::test]
    async fn test_create_user_failure_still_disposes() {
        let (identity, store, session) = admin_session().await;
        let before = identity.current_user();
        store.fail_next(
            StoreOp::Set,
            VendorError::new(ErrorCode::PermissionDenied, "write denied"),
        );

        let err = session.create_user(request("cliente@example.com")).await.unwrap_err();
        match err {
            Error::Vendor(vendor) => assert_eq!(vendor.code, ErrorCode::PermissionDenied),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(identity.dispose_attempts(), 1);
        assert_eq!(identity.current_user(), before);
    }

    #[tokio::test]
    async fn test_dispose_failure_does_not_mask_original_error() {
        let (identity, _, session) = admin_session().await;
        identity.fail_next(
            IdentityOp::CreateAccount,
            VendorError::new(ErrorCode::AlreadyExists, "exists"),
        );
        identity.fail_next(
            IdentityOp::Dispose,
            VendorError::new(ErrorCode::Unavailable, "teardown failed"),
        );

        let err = session.create_user(request("cliente@example.com")).await.unwrap_err();
        match err {
            Error::Vendor(vendor) => assert_eq!(vendor.code, ErrorCode::AlreadyExists),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(identity.dispose_attempts(), 1);
        assert!(session.state().is_admin());
    }

    #[tokio::test]
    async fn test_create_user_requires_admin() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let user = identity.register("ana@example.com", "secret1");
        seed_profile(&store, &user.uid, "ana@example.com", "client").await;
        let mut session =
            SessionProvider::initialize(identity.clone(), store, SessionOptions::default()).await;
        session.login("ana@example.com", "secret1").await.unwrap();

        let err = session.create_user(request("x@example.com")).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden));
        assert_eq!(identity.isolated_created(), 0);
    }

    #[tokio::test]
    async fn test_teardown_releases_subscription() {
        let (identity, _, session) = admin_session().await;
        assert_eq!(identity.subscriber_count(), 1);
        let states = session.subscribe();

        session.teardown();
        assert_eq!(identity.subscriber_count(), 0);
        assert_eq!(*states.borrow(), SessionState::SignedOut);
    }
}
