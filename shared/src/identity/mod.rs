//! Identity service seam.
//!
//! An [`IdentityService`] instance behaves like a client-side auth SDK: it
//! holds at most one signed-in user and publishes every change of that user
//! on a `watch` channel. [`IdentityService::isolated`] creates a secondary
//! instance with its own signed-in state, used for operations that must not
//! disturb the primary session.

mod cognito;
mod memory;

pub use cognito::CognitoIdentity;
pub use memory::{IdentityOp, MemoryIdentity};

use crate::error::VendorError;
use crate::types::AuthUser;
use std::future::Future;
use tokio::sync::watch;

pub trait IdentityService: Sized {
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthUser, VendorError>>;

    fn sign_out(&self) -> impl Future<Output = Result<(), VendorError>>;

    /// Create an account and leave it signed in on this instance.
    fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthUser, VendorError>>;

    fn current_user(&self) -> Option<AuthUser>;

    /// Receive every auth-state change of this instance.
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;

    /// New instance sharing the backend but not the signed-in state.
    fn isolated(&self, name: &str) -> Result<Self, VendorError>;

    /// Sign out if needed and release the instance.
    fn dispose(self) -> impl Future<Output = Result<(), VendorError>>;
}
