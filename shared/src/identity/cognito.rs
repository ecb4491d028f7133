use super::IdentityService;
use crate::config::CognitoConfig;
use crate::error::{ErrorCode, VendorError};
use crate::types::AuthUser;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType};
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::{watch, Mutex};

type HmacSha256 = Hmac<Sha256>;

/// Compute the SECRET_HASH for Cognito authentication
fn compute_secret_hash(username: &str, client_id: &str, client_secret: &str) -> String {
    let message = format!("{}{}", username, client_id);
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let result = mac.finalize();
    general_purpose::STANDARD.encode(result.into_bytes())
}

#[derive(Debug)]
struct Tokens {
    access_token: String,
}

/// Cognito user pool client holding one signed-in user.
#[derive(Debug)]
pub struct CognitoIdentity {
    client: CognitoClient,
    config: CognitoConfig,
    instance: String,
    tokens: Mutex<Option<Tokens>>,
    state: watch::Sender<Option<AuthUser>>,
}

impl CognitoIdentity {
    pub fn new(client: CognitoClient, config: CognitoConfig) -> Self {
        Self::named(client, config, "primary")
    }

    fn named(client: CognitoClient, config: CognitoConfig, instance: &str) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            client,
            config,
            instance: instance.to_string(),
            tokens: Mutex::new(None),
            state,
        }
    }

    /// Look up `sub` and `email` for the owner of an access token.
    async fn fetch_user(&self, access_token: &str) -> Result<AuthUser, VendorError> {
        let output = self
            .client
            .get_user()
            .access_token(access_token)
            .send()
            .await
            .map_err(|e| VendorError::from_sdk("Cognito get_user", e))?;

        let attribute = |name: &str| {
            output
                .user_attributes()
                .iter()
                .find(|attr| attr.name() == name)
                .and_then(|attr| attr.value())
                .map(|value| value.to_string())
        };

        let uid = attribute("sub").ok_or_else(|| {
            VendorError::new(ErrorCode::Unknown, "Cognito user has no sub attribute")
        })?;
        let email = attribute("email").unwrap_or_default();

        Ok(AuthUser { uid, email })
    }
}

impl IdentityService for CognitoIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, VendorError> {
        tracing::info!("[{}] Authenticating user: {}", self.instance, email);

        let secret_hash =
            compute_secret_hash(email, &self.config.client_id, &self.config.client_secret);

        let response = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.config.client_id)
            .auth_parameters("USERNAME", email)
            .auth_parameters("PASSWORD", password)
            .auth_parameters("SECRET_HASH", &secret_hash)
            .send()
            .await
            .map_err(|e| VendorError::from_sdk("Cognito sign-in", e))?;

        let auth_result = response.authentication_result().ok_or_else(|| {
            tracing::error!("No authentication result returned");
            VendorError::new(
                ErrorCode::InvalidCredentials,
                "No authentication result returned",
            )
        })?;
        let access_token = auth_result.access_token().unwrap_or_default().to_string();

        let user = self.fetch_user(&access_token).await?;
        *self.tokens.lock().await = Some(Tokens { access_token });
        self.state.send_replace(Some(user.clone()));

        tracing::info!("[{}] Authentication successful for user: {}", self.instance, email);
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), VendorError> {
        let mut tokens = self.tokens.lock().await;
        if let Some(current) = tokens.as_ref() {
            self.client
                .global_sign_out()
                .access_token(&current.access_token)
                .send()
                .await
                .map_err(|e| VendorError::from_sdk("Cognito sign-out", e))?;
        }
        *tokens = None;
        drop(tokens);

        self.state.send_replace(None);
        tracing::info!("[{}] Signed out", self.instance);
        Ok(())
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, VendorError> {
        tracing::info!("[{}] Signing up user: {}", self.instance, email);

        let secret_hash =
            compute_secret_hash(email, &self.config.client_id, &self.config.client_secret);

        let email_attribute = AttributeType::builder()
            .name("email")
            .value(email)
            .build()
            .map_err(|e| VendorError::new(ErrorCode::InvalidArgument, e.to_string()))?;

        self.client
            .sign_up()
            .client_id(&self.config.client_id)
            .username(email)
            .password(password)
            .secret_hash(&secret_hash)
            .user_attributes(email_attribute)
            .send()
            .await
            .map_err(|e| VendorError::from_sdk("Cognito sign-up", e))?;

        // Accounts created by an admin skip email verification
        self.client
            .admin_confirm_sign_up()
            .user_pool_id(&self.config.user_pool_id)
            .username(email)
            .send()
            .await
            .map_err(|e| VendorError::from_sdk("Cognito admin_confirm_sign_up", e))?;

        tracing::info!("[{}] User confirmed: {}", self.instance, email);
        self.sign_in(email, password).await
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }

    fn isolated(&self, name: &str) -> Result<Self, VendorError> {
        Ok(Self::named(self.client.clone(), self.config.clone(), name))
    }

    async fn dispose(self) -> Result<(), VendorError> {
        if self.current_user().is_some() {
            self.sign_out().await?;
        }
        tracing::info!("[{}] Instance disposed", self.instance);
        Ok(())
    }
}
