// Bookrig - book digitization rig orchestration
// Core engine: workflow lifecycle state machine, concurrent device
// dispatch, plugin hook pipeline, page naming and the hardware trigger
// bridge. Device drivers, processing plugins and the HTTP surface live in
// separate crates and plug in through the traits exposed here.

pub mod config;
pub mod device;
pub mod dispatch;
pub mod errors;
pub mod hooks;
pub mod pagination;
pub mod telemetry;
pub mod trigger;
pub mod workflow;

// Re-export key types for easy access
pub use config::{DeviceConfig, RigConfig, TriggerConfig};
pub use device::{Device, DeviceResolver, TargetPage};
pub use errors::{DeviceError, DispatchError, HookError, WorkflowError};
pub use hooks::{CaptureCallback, CaptureFuture, HookPipeline, HookPlugin};
pub use telemetry::init_telemetry;
pub use trigger::{SwitchTriggerPlugin, TriggerLoop, TriggerSource, TriggerSourceProvider};
pub use workflow::{Step, Workflow, WorkflowStatus};
