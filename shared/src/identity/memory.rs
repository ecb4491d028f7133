use super::IdentityService;
use crate::error::{ErrorCode, VendorError};
use crate::types::AuthUser;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Operations of [`MemoryIdentity`] that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityOp {
    SignIn,
    SignOut,
    CreateAccount,
    Dispose,
}

#[derive(Debug)]
struct Account {
    uid: String,
    password: String,
}

#[derive(Debug, Default)]
struct Directory {
    accounts: HashMap<String, Account>,
    faults: HashMap<IdentityOp, VendorError>,
    isolated_created: usize,
    dispose_attempts: usize,
}

/// In-memory identity service for tests and local runs.
///
/// Clones share the same instance; [`IdentityService::isolated`] instances
/// share only the account directory.
#[derive(Debug, Clone)]
pub struct MemoryIdentity {
    directory: Arc<Mutex<Directory>>,
    instance: String,
    state: Arc<watch::Sender<Option<AuthUser>>>,
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentity {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            directory: Arc::new(Mutex::new(Directory::default())),
            instance: "primary".to_string(),
            state: Arc::new(state),
        }
    }

    fn directory(&self) -> MutexGuard<'_, Directory> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_fault(&self, op: IdentityOp) -> Result<(), VendorError> {
        match self.directory().faults.remove(&op) {
            Some(err) => {
                tracing::warn!("[{}] Injected {:?} failure: {}", self.instance, op, err);
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Add an account without signing it in.
    pub fn register(&self, email: &str, password: &str) -> AuthUser {
        let uid = uuid::Uuid::new_v4().to_string();
        self.directory().accounts.insert(
            email.to_string(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );
        AuthUser {
            uid,
            email: email.to_string(),
        }
    }

    /// Make the next call of `op`, on any instance, fail with `err`.
    pub fn fail_next(&self, op: IdentityOp, err: VendorError) {
        self.directory().faults.insert(op, err);
    }

    pub fn isolated_created(&self) -> usize {
        self.directory().isolated_created
    }

    pub fn dispose_attempts(&self) -> usize {
        self.directory().dispose_attempts
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    pub fn account_exists(&self, email: &str) -> bool {
        self.directory().accounts.contains_key(email)
    }
}

impl IdentityService for MemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, VendorError> {
        self.take_fault(IdentityOp::SignIn)?;

        let uid = {
            let directory = self.directory();
            match directory.accounts.get(email) {
                Some(account) if account.password == password => account.uid.clone(),
                _ => {
                    return Err(VendorError::new(
                        ErrorCode::InvalidCredentials,
                        "Incorrect email or password",
                    ))
                }
            }
        };

        let user = AuthUser {
            uid,
            email: email.to_string(),
        };
        self.state.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), VendorError> {
        self.take_fault(IdentityOp::SignOut)?;
        self.state.send_replace(None);
        Ok(())
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, VendorError> {
        self.take_fault(IdentityOp::CreateAccount)?;

        if password.len() < 6 {
            return Err(VendorError::new(
                ErrorCode::InvalidArgument,
                "Password must be at least 6 characters",
            ));
        }
        if self.account_exists(email) {
            return Err(VendorError::new(
                ErrorCode::AlreadyExists,
                "An account with this email already exists",
            ));
        }

        self.register(email, password);
        self.sign_in(email, password).await
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }

    fn isolated(&self, name: &str) -> Result<Self, VendorError> {
        self.directory().isolated_created += 1;
        let (state, _) = watch::channel(None);
        Ok(Self {
            directory: Arc::clone(&self.directory),
            instance: name.to_string(),
            state: Arc::new(state),
        })
    }

    async fn dispose(self) -> Result<(), VendorError> {
        self.directory().dispose_attempts += 1;
        self.take_fault(IdentityOp::Dispose)?;
        self.state.send_replace(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_publishes_state() {
        let identity = MemoryIdentity::new();
        let registered = identity.register("ana@example.com", "secret1");
        let mut rx = identity.subscribe();

        let user = identity.sign_in("ana@example.com", "secret1").await.unwrap();
        assert_eq!(user, registered);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().clone(), Some(registered));

        identity.sign_out().await.unwrap();
        assert!(identity.current_user().is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let identity = MemoryIdentity::new();
        identity.register("ana@example.com", "secret1");

        let err = identity.sign_in("ana@example.com", "nope").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCredentials);
        assert!(identity.current_user().is_none());
    }

    #[tokio::test]
    async fn test_isolated_instance_has_own_state() {
        let primary = MemoryIdentity::new();
        primary.register("admin@example.com", "secret1");
        primary.sign_in("admin@example.com", "secret1").await.unwrap();

        let secondary = primary.isolated("secondary").unwrap();
        assert!(secondary.current_user().is_none());

        let created = secondary.create_account("new@example.com", "secret2").await.unwrap();
        assert_eq!(secondary.current_user(), Some(created));
        assert_eq!(primary.current_user().unwrap().email, "admin@example.com");
        assert!(primary.account_exists("new@example.com"));

        secondary.dispose().await.unwrap();
        assert_eq!(primary.dispose_attempts(), 1);
        assert_eq!(primary.current_user().unwrap().email, "admin@example.com");
    }

    #[tokio::test]
    async fn test_injected_fault_fires_once() {
        let identity = MemoryIdentity::new();
        identity.register("ana@example.com", "secret1");
        identity.fail_next(
            IdentityOp::SignIn,
            VendorError::new(ErrorCode::Unavailable, "offline"),
        );

        let err = identity.sign_in("ana@example.com", "secret1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unavailable);
        assert!(identity.sign_in("ana@example.com", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_account_is_rejected() {
        let identity = MemoryIdentity::new();
        identity.register("ana@example.com", "secret1");
        let err = identity
            .create_account("ana@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyExists);
    }
}
