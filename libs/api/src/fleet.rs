//! Fleet resource.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::device::DeviceSpec;
use crate::meta::ObjectMeta;
use crate::API_VERSION;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

/// Template stamped onto every device selected by the fleet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceTemplate {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: DeviceSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,

    pub template: DeviceTemplate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout_policy: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fleet {
    pub api_version: String,

    pub kind: String,

    pub metadata: ObjectMeta,

    pub spec: FleetSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
}

impl Fleet {
    /// Fleet selecting devices by `match_labels`.
    pub fn with_selector(
        name: impl Into<String>,
        match_labels: BTreeMap<String, String>,
        template: DeviceSpec,
    ) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: crate::kinds::FLEET.to_string(),
            metadata: ObjectMeta::named(name),
            spec: FleetSpec {
                selector: Some(LabelSelector {
                    match_labels: match_labels.clone(),
                }),
                template: DeviceTemplate {
                    metadata: ObjectMeta {
                        labels: Some(match_labels),
                        ..ObjectMeta::default()
                    },
                    spec: template,
                },
                rollout_policy: None,
            },
            status: None,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }
}
