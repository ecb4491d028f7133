//! Client selector data: the list of client profiles an admin can pick from.

use crate::error::{ErrorCode, VendorError};
use crate::session::SessionState;
use crate::store::{DocumentStore, USERS};
use crate::types::{ClientProfile, Role};
use serde_json::Value;

/// User-facing classification of a failed client fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    PermissionDenied,
    Unavailable,
    Generic,
}

impl FetchFailure {
    pub fn classify(err: &VendorError) -> Self {
        match err.code {
            ErrorCode::PermissionDenied => FetchFailure::PermissionDenied,
            ErrorCode::Unavailable => FetchFailure::Unavailable,
            _ => FetchFailure::Generic,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FetchFailure::PermissionDenied => {
                "Você não tem permissão para listar os clientes."
            }
            FetchFailure::Unavailable => {
                "Serviço temporariamente indisponível. Tente novamente em instantes."
            }
            FetchFailure::Generic => "Não foi possível carregar os clientes.",
        }
    }
}

/// What the selector control should present.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientChoice {
    /// Not an admin, or the profile is not loaded yet.
    Disabled,
    Options(Vec<ClientProfile>),
    Failed(FetchFailure),
}

impl ClientChoice {
    pub fn options(&self) -> &[ClientProfile] {
        match self {
            ClientChoice::Options(clients) => clients,
            _ => &[],
        }
    }

    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            ClientChoice::Failed(failure) => Some(failure.message()),
            _ => None,
        }
    }
}

fn project(id: String, document: &Value) -> ClientProfile {
    let text = |key: &str| {
        document
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    ClientProfile {
        id,
        name: text("name"),
        email: text("email"),
        role: Role::Client,
    }
}

/// Fetch every client profile when the session belongs to an admin.
pub async fn load_clients<S: DocumentStore>(state: &SessionState, store: &S) -> ClientChoice {
    if !state.is_admin() {
        return ClientChoice::Disabled;
    }

    match store.query_eq(USERS, "role", Role::Client.as_str()).await {
        Ok(documents) => {
            let mut clients: Vec<ClientProfile> = documents
                .into_iter()
                .map(|(id, document)| project(id, &document))
                .collect();
            clients.sort_by_key(|client| client.name.to_lowercase());
            tracing::info!("Loaded {} clients", clients.len());
            ClientChoice::Options(clients)
        }
        Err(e) => {
            let failure = FetchFailure::classify(&e);
            if failure == FetchFailure::Generic {
                tracing::error!("Failed to load clients: {}", e);
            } else {
                tracing::warn!("Failed to load clients: {}", e);
            }
            ClientChoice::Failed(failure)
        }
    }
}
