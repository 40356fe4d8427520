//! Device resource.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conditions::{self, reasons, types, Condition, ConditionStatus};
use crate::error::ApiError;
use crate::meta::ObjectMeta;
use crate::API_VERSION;

/// Directory where the agent writes quadlet units on the device.
pub const QUADLET_UNIT_PATH: &str = "/etc/containers/systemd";

/// Directory where the agent writes compose applications on the device.
pub const COMPOSE_MANIFESTS_PATH: &str = "/etc/compose/manifests";

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum $name {
            $($variant,)+
            #[default]
            #[serde(other)]
            Unknown,
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str(stringify!($variant)),)+
                    Self::Unknown => f.write_str("Unknown"),
                }
            }
        }
    };
}

status_enum!(
    /// Overall device health.
    DeviceSummaryStatus {
        Online,
        Degraded,
        Error,
        Rebooting,
        PoweredOff,
        AwaitingReconnect,
        ConflictPaused,
    }
);

status_enum!(
    /// Whether the device runs its latest spec.
    DeviceUpdatedStatus { UpToDate, Updating, OutOfDate }
);

status_enum!(
    /// Aggregate health of the device applications.
    ApplicationsSummaryStatus {
        Healthy,
        Degraded,
        Error,
        NoApplications,
    }
);

status_enum!(
    /// State of one application on a device.
    ApplicationStatus {
        Preparing,
        Starting,
        Running,
        Error,
        Completed,
    }
);

/// A status value with an optional human-readable explanation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "S: Deserialize<'de> + Default"))]
pub struct StatusInfo<S> {
    #[serde(default)]
    pub status: S,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

/// Desired OS image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceOsSpec {
    pub image: String,
}

/// A file delivered inline in a config or application provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSpec {
    pub path: String,

    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
}

/// Reference into a git repository resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRef {
    pub repository: String,
    pub target_revision: String,
    pub path: String,
}

/// Reference into an HTTP repository resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRef {
    pub repository: String,
    pub file_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// One entry of `spec.config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigProviderSpec {
    Inline {
        name: String,
        inline: Vec<FileSpec>,
    },
    Git {
        name: String,
        #[serde(rename = "gitRef")]
        git_ref: GitRef,
    },
    Http {
        name: String,
        #[serde(rename = "httpRef")]
        http_ref: HttpRef,
    },
    Other(Value),
}

impl ConfigProviderSpec {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Inline { name, .. } | Self::Git { name, .. } | Self::Http { name, .. } => {
                Some(name)
            }
            Self::Other(v) => v.get("name").and_then(Value::as_str),
        }
    }
}

/// One entry of `spec.applications`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationProviderSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default = "default_app_type")]
    pub app_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<Vec<FileSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<BTreeMap<String, String>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_app_type() -> String {
    "compose".to_string()
}

impl ApplicationProviderSpec {
    /// Compose application pulled from an image.
    pub fn image(name: &str, image: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            app_type: default_app_type(),
            image: Some(image.to_string()),
            ..Self::default()
        }
    }

    /// Compose application with inline files.
    pub fn inline(name: &str, files: Vec<FileSpec>) -> Self {
        Self {
            name: Some(name.to_string()),
            app_type: default_app_type(),
            inline: Some(files),
            ..Self::default()
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        if !env.is_empty() {
            self.env_vars = Some(env);
        }
        self
    }
}

/// Device spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<DeviceOsSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Vec<ConfigProviderSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applications: Option<Vec<ApplicationProviderSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Application state reported by the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceApplicationStatus {
    pub name: String,

    /// Ready containers over total, e.g. "2/3".
    #[serde(default)]
    pub ready: String,

    #[serde(default)]
    pub restarts: i32,

    #[serde(default)]
    pub status: ApplicationStatus,

    #[serde(default)]
    pub embedded: bool,
}

impl DeviceApplicationStatus {
    /// Whether every container counted in `ready` is up.
    pub fn all_ready(&self) -> bool {
        matches!(parse_ready_counts(&self.ready), Some((ready, total)) if ready == total)
    }
}

/// Parse an "a/b" ready count.
pub fn parse_ready_counts(ready: &str) -> Option<(u32, u32)> {
    let (a, b) = ready.split_once('/')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

/// Host facts reported by the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSystemInfo {
    #[serde(default)]
    pub architecture: String,

    #[serde(default, rename = "bootID")]
    pub boot_id: String,

    #[serde(default)]
    pub operating_system: String,

    #[serde(default)]
    pub agent_version: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DeviceSystemInfo {
    /// True until the agent has reported anything.
    pub fn is_empty(&self) -> bool {
        self.architecture.is_empty()
            && self.boot_id.is_empty()
            && self.operating_system.is_empty()
            && self.agent_version.is_empty()
            && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfigStatus {
    #[serde(default)]
    pub rendered_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceOsStatus {
    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub image_digest: String,
}

/// Device status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub summary: StatusInfo<DeviceSummaryStatus>,

    #[serde(default)]
    pub updated: StatusInfo<DeviceUpdatedStatus>,

    #[serde(default)]
    pub applications_summary: StatusInfo<ApplicationsSummaryStatus>,

    #[serde(default)]
    pub applications: Vec<DeviceApplicationStatus>,

    #[serde(default)]
    pub system_info: DeviceSystemInfo,

    #[serde(default)]
    pub config: DeviceConfigStatus,

    #[serde(default)]
    pub os: DeviceOsStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A managed device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub api_version: String,

    pub kind: String,

    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<DeviceSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeviceStatus>,
}

impl Device {
    pub fn new(name: impl Into<String>, spec: DeviceSpec) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: crate::kinds::DEVICE.to_string(),
            metadata: ObjectMeta::named(name),
            spec: Some(spec),
            status: None,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// Spec, created empty if absent.
    pub fn spec_mut(&mut self) -> &mut DeviceSpec {
        self.spec.get_or_insert_with(DeviceSpec::default)
    }

    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    pub fn summary_status(&self) -> Option<DeviceSummaryStatus> {
        self.status.as_ref().map(|s| s.summary.status)
    }

    pub fn updated_status(&self) -> Option<DeviceUpdatedStatus> {
        self.status.as_ref().map(|s| s.updated.status)
    }

    pub fn applications_summary_status(&self) -> Option<ApplicationsSummaryStatus> {
        self.status.as_ref().map(|s| s.applications_summary.status)
    }

    pub fn applications(&self) -> &[DeviceApplicationStatus] {
        self.status
            .as_ref()
            .map(|s| s.applications.as_slice())
            .unwrap_or_default()
    }

    pub fn application(&self, name: &str) -> Option<&DeviceApplicationStatus> {
        self.applications().iter().find(|a| a.name == name)
    }

    /// Rendered spec version reported in status.
    pub fn rendered_version(&self) -> Result<i64, ApiError> {
        let status = self
            .status
            .as_ref()
            .ok_or_else(|| ApiError::missing("device", self.name(), "status"))?;
        let raw = status.config.rendered_version.as_str();
        match raw.trim().parse::<i64>() {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(ApiError::InvalidRenderedVersion(raw.to_string())),
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.updated_status() == Some(DeviceUpdatedStatus::UpToDate)
    }

    /// UpToDate with an Updating=False/Updated condition.
    pub fn has_finished_update(&self) -> bool {
        self.is_up_to_date()
            && conditions::condition_exists(
                self.conditions(),
                types::UPDATING,
                ConditionStatus::False,
                reasons::UPDATED,
            )
    }

    /// Whether the agent has picked up `expected_version`, either by already
    /// reporting it or by being in one of the early update phases.
    pub fn is_update_observed(&self, expected_version: i64) -> bool {
        if matches!(self.rendered_version(), Ok(v) if v == expected_version) {
            return true;
        }
        conditions::find_condition(self.conditions(), types::UPDATING).is_some_and(|c| {
            matches!(
                c.reason.as_str(),
                reasons::PREPARING | reasons::READY_TO_UPDATE | reasons::APPLYING_UPDATE
            )
        })
    }

    pub fn os_image(&self) -> Option<&str> {
        self.spec.as_ref()?.os.as_ref().map(|os| os.image.as_str())
    }
}
