use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ========== ROLES & USERS ==========
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Client => "client",
        }
    }
}

/// Identity as reported by the identity service, before any profile lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// Profile document stored at `users/{uid}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: String,
}

/// Signed-in identity joined with its role-tagged profile.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub uid: String,
    pub email: String,
    pub role: Role,
    pub name: Option<String>,
    pub created_at: String,
}

impl SessionUser {
    pub fn from_profile(uid: &str, profile: UserProfile) -> Self {
        Self {
            uid: uid.to_string(),
            email: profile.email,
            role: profile.role,
            name: profile.name,
            created_at: profile.created_at,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Client entry offered by the client selector.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClientProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub name: Option<String>,
}

// ========== TEMPLATES ==========
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Landing,
    Institucional,
}

impl TemplateType {
    pub const ALL: [TemplateType; 2] = [TemplateType::Landing, TemplateType::Institucional];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "landing" => Some(TemplateType::Landing),
            "institucional" => Some(TemplateType::Institucional),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Landing => "landing",
            TemplateType::Institucional => "institucional",
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Textarea,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub input_kind: InputKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDescriptor {
    pub id: &'static str,
    #[serde(rename = "type")]
    pub template_type: TemplateType,
    pub variation_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

// ========== SITES ==========
/// Site document stored at `sites/{client_id}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteDocument {
    pub client_id: String,
    pub template_id: String,
    pub template_type: TemplateType,
    pub variation_id: String,
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub images: BTreeMap<String, String>,
    pub updated_at: String,
    pub updated_by: String,
}

/// Form submission for a client's site, before validation.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SiteDraft {
    pub template_id: String,
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub images: BTreeMap<String, String>,
}
