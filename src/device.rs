// Device capability contract - the seam between the orchestrator and the
// concrete camera drivers, which live outside this crate.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DeviceError;

/// Which half of the interleaved page sequence a device shoots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPage {
    Odd,
    Even,
}

/// Contract every imaging device must satisfy.
///
/// The orchestrator treats devices as a short ordered collection (one or two
/// stations on a scanner rig), never individually addressed beyond their
/// target-page role. Each lifecycle operation may have real-world side
/// effects (shutter trigger, mount/unmount) and may fail; failures are
/// propagated, never retried here.
#[async_trait]
pub trait Device: Send + Sync {
    fn name(&self) -> &str;

    /// Role of this device in the page sequence, `None` when unconfigured.
    fn target_page(&self) -> Option<TargetPage>;

    /// Reassign the role. Used when `flip_target_pages` is configured.
    fn set_target_page(&self, target: Option<TargetPage>);

    fn connected(&self) -> bool;

    /// Extension of the image files this device produces.
    fn file_extension(&self) -> &str {
        "jpg"
    }

    async fn prepare_capture(&self, workflow_path: &Path) -> Result<(), DeviceError>;

    async fn capture(&self, destination: &Path) -> Result<(), DeviceError>;

    async fn finish_capture(&self) -> Result<(), DeviceError>;
}

/// Resolves the devices currently attached to the rig. Implemented by the
/// driver layer; injected into every workflow.
#[async_trait]
pub trait DeviceResolver: Send + Sync {
    async fn resolve(&self) -> Result<Vec<Arc<dyn Device>>, DeviceError>;
}
