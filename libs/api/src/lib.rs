//! # fctl-api
//!
//! Serde models for the resources the e2e harness drives through the fleet
//! management API and the image builder API.
//!
//! The models cover what the tests read and write. Fields the harness does
//! not touch are kept in `extra` maps so a GET followed by a PUT does not drop
//! server-side data.
//!
//! ## Resources
//!
//! - `Device`, `Fleet`, `EnrollmentRequest`
//! - `Repository`, `ResourceSync`
//! - `ImageBuild`, `ImageExport`
//!
//! ## Helpers
//!
//! - `conditions`: lookup and matching on status conditions
//! - `labels`: label maps, selectors, and YAML label rewriting

pub mod conditions;
mod device;
mod enrollment;
mod error;
mod fleet;
mod imagebuild;
pub mod labels;
mod meta;
mod repository;

pub use conditions::{Condition, ConditionStatus};
pub use device::*;
pub use enrollment::*;
pub use error::ApiError;
pub use fleet::*;
pub use imagebuild::*;
pub use labels::labels_to_selector;
pub use meta::*;
pub use repository::*;

/// API group of every core resource.
pub const API_GROUP: &str = "flightctl.io";

/// API version of the core resources.
pub const API_VERSION: &str = "flightctl.io/v1beta1";

/// API version of the image builder resources.
pub const IMAGEBUILDER_API_VERSION: &str = "flightctl.io/v1alpha1";

/// Label carrying the per-test ID on every resource a test creates.
pub const TEST_ID_LABEL: &str = "test-id";
