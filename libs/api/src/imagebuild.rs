//! ImageBuild and ImageExport resources of the image builder API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conditions::{self, types, Condition};
use crate::meta::ObjectMeta;
use crate::IMAGEBUILDER_API_VERSION;

/// Sentinel the image builder sends as the last SSE payload of a log stream.
pub const LOG_STREAM_COMPLETE_MARKER: &str = "<<STREAM_COMPLETE>>";

/// Reasons carried by the Ready condition of builds and exports.
pub mod build_reasons {
    pub const PENDING: &str = "Pending";
    pub const BUILDING: &str = "Building";
    pub const PUSHING: &str = "Pushing";
    pub const CONVERTING: &str = "Converting";
    pub const COMPLETED: &str = "Completed";
    pub const FAILED: &str = "Failed";
    pub const CANCELING: &str = "Canceling";
    pub const CANCELED: &str = "Canceled";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBuildSource {
    pub repository: String,
    pub image_name: String,
    pub image_tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBuildDestination {
    pub repository: String,
    pub image_name: String,
    pub image_tag: String,
}

/// How the built image obtains its enrollment credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImageBuildBinding {
    /// Credentials are baked in at build time.
    Early,
    /// Credentials are supplied at first boot (cloud-init).
    Late,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBuildUserConfiguration {
    pub username: String,
    pub publickey: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBuildSpec {
    pub source: ImageBuildSource,

    pub destination: ImageBuildDestination,

    pub binding: ImageBuildBinding,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_configuration: Option<ImageBuildUserConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBuildStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_digest: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Reason and message of the Ready condition, if there is one.
fn ready_condition(status: Option<&ImageBuildStatus>) -> Option<(&str, &str)> {
    let conditions = status?.conditions.as_deref()?;
    conditions::find_condition(conditions, types::READY)
        .map(|c| (c.reason.as_str(), c.message.as_str()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBuild {
    pub api_version: String,

    pub kind: String,

    pub metadata: ObjectMeta,

    pub spec: ImageBuildSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ImageBuildStatus>,
}

impl ImageBuild {
    pub fn new(name: impl Into<String>, spec: ImageBuildSpec) -> Self {
        Self {
            api_version: IMAGEBUILDER_API_VERSION.to_string(),
            kind: crate::kinds::IMAGE_BUILD.to_string(),
            metadata: ObjectMeta::named(name),
            spec,
            status: None,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// Ready condition reason and message, if the builder has set one.
    pub fn ready_condition(&self) -> Option<(&str, &str)> {
        ready_condition(self.status.as_ref())
    }

    /// Ready condition reason; builds without one are Pending.
    pub fn ready_reason(&self) -> &str {
        self.ready_condition()
            .map(|(reason, _)| reason)
            .unwrap_or(build_reasons::PENDING)
    }
}

/// Disk image formats an export can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportFormat {
    #[serde(rename = "qcow2")]
    Qcow2,
    #[serde(rename = "vmdk")]
    Vmdk,
    #[serde(rename = "iso")]
    Iso,
    #[serde(rename = "qcow2-disk-container")]
    Qcow2DiskContainer,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Qcow2 => "qcow2",
            Self::Vmdk => "vmdk",
            Self::Iso => "iso",
            Self::Qcow2DiskContainer => "qcow2-disk-container",
        };
        f.write_str(s)
    }
}

/// Where an export takes its bootc image from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ImageExportSource {
    #[serde(rename = "imageBuild", rename_all = "camelCase")]
    ImageBuild { image_build_ref: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageExportSpec {
    pub source: ImageExportSource,
    pub format: ExportFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageExport {
    pub api_version: String,

    pub kind: String,

    pub metadata: ObjectMeta,

    pub spec: ImageExportSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ImageBuildStatus>,
}

impl ImageExport {
    pub fn new(name: impl Into<String>, spec: ImageExportSpec) -> Self {
        Self {
            api_version: IMAGEBUILDER_API_VERSION.to_string(),
            kind: crate::kinds::IMAGE_EXPORT.to_string(),
            metadata: ObjectMeta::named(name),
            spec,
            status: None,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    pub fn ready_condition(&self) -> Option<(&str, &str)> {
        ready_condition(self.status.as_ref())
    }

    pub fn ready_reason(&self) -> &str {
        self.ready_condition()
            .map(|(reason, _)| reason)
            .unwrap_or(build_reasons::PENDING)
    }
}
