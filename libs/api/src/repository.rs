//! Repository and ResourceSync resources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conditions::{self, types, Condition, ConditionStatus};
use crate::meta::ObjectMeta;
use crate::API_VERSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    Git,
    Http,
    Oci,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfig {
    /// Base64 encoded private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_private_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_server_verification: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_server_verification: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySpec {
    #[serde(rename = "type")]
    pub repo_type: RepoType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_config: Option<SshConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oci_config: Option<Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RepositorySpec {
    pub fn git(url: impl Into<String>) -> Self {
        Self::with_url(RepoType::Git, url)
    }

    pub fn http(url: impl Into<String>) -> Self {
        Self::with_url(RepoType::Http, url)
    }

    pub fn oci(registry: impl Into<String>) -> Self {
        Self {
            repo_type: RepoType::Oci,
            url: None,
            registry: Some(registry.into()),
            ssh_config: None,
            http_config: None,
            oci_config: None,
            extra: BTreeMap::new(),
        }
    }

    fn with_url(repo_type: RepoType, url: impl Into<String>) -> Self {
        Self {
            repo_type,
            url: Some(url.into()),
            registry: None,
            ssh_config: None,
            http_config: None,
            oci_config: None,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub api_version: String,

    pub kind: String,

    pub metadata: ObjectMeta,

    pub spec: RepositorySpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RepositoryStatus>,
}

impl Repository {
    pub fn new(name: impl Into<String>, spec: RepositorySpec) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: crate::kinds::REPOSITORY.to_string(),
            metadata: ObjectMeta::named(name),
            spec,
            status: None,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// Accessible condition is True.
    pub fn is_accessible(&self) -> bool {
        self.status.as_ref().is_some_and(|s| {
            conditions::condition_status_exists(
                &s.conditions,
                types::ACCESSIBLE,
                ConditionStatus::True,
            )
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSyncSpec {
    pub repository: String,
    pub target_revision: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSync {
    pub api_version: String,

    pub kind: String,

    pub metadata: ObjectMeta,

    pub spec: ResourceSyncSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RepositoryStatus>,
}

impl ResourceSync {
    pub fn new(name: impl Into<String>, spec: ResourceSyncSpec) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: crate::kinds::RESOURCE_SYNC.to_string(),
            metadata: ObjectMeta::named(name),
            spec,
            status: None,
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}
