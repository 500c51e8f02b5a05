//! Hook pipeline - lifecycle extension points for plugins.
//!
//! Every lifecycle step of a workflow fires a named hook. Plugins implement
//! the subset of hooks they care about; the trait's default no-op bodies
//! make a missing hook a skip, not an error. There is no error isolation
//! between plugins: the first failing hook aborts the remaining plugins for
//! that call and propagates to the lifecycle method that fired it.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::device::Device;
use crate::errors::{HookError, WorkflowError};

/// Boxed future produced by the capture callback.
pub type CaptureFuture = Pin<Box<dyn Future<Output = Result<(), WorkflowError>> + Send>>;

/// Zero-argument callback that shoots one capture round on the workflow
/// that handed it out. Given to `start_trigger_loop` hooks so external
/// trigger hardware can fire captures without the caller's involvement.
pub type CaptureCallback = Arc<dyn Fn() -> CaptureFuture + Send + Sync>;

/// A loaded plugin. Implement only the hooks you need.
#[async_trait]
pub trait HookPlugin: Send + Sync {
    fn name(&self) -> &str;

    async fn on_prepare_capture(
        &self,
        _devices: &[Arc<dyn Device>],
        _workflow_path: &Path,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Arm an external trigger source. Implementations that own trigger
    /// hardware spin up their background loop here; when no eligible
    /// hardware is attached they must fail instead of silently starting a
    /// no-op loop.
    async fn on_start_trigger_loop(&self, _capture: CaptureCallback) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_capture(
        &self,
        _devices: &[Arc<dyn Device>],
        _workflow_path: &Path,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Tear the trigger loop down. Must not return before the loop has
    /// actually exited.
    async fn on_stop_trigger_loop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_finish_capture(
        &self,
        _devices: &[Arc<dyn Device>],
        _workflow_path: &Path,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_process(&self, _workflow_path: &Path) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_output(&self, _workflow_path: &Path) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Invokes a named hook on every loaded plugin, in registration order,
/// with the same arguments for each.
pub struct HookPipeline {
    plugins: Vec<Arc<dyn HookPlugin>>,
}

impl HookPipeline {
    pub fn new(plugins: Vec<Arc<dyn HookPlugin>>) -> Self {
        Self { plugins }
    }

    pub fn plugins(&self) -> &[Arc<dyn HookPlugin>] {
        &self.plugins
    }

    pub async fn prepare_capture(
        &self,
        devices: &[Arc<dyn Device>],
        workflow_path: &Path,
    ) -> Result<(), HookError> {
        debug!(hook = "prepare_capture", "running hooks");
        for plugin in &self.plugins {
            plugin
                .on_prepare_capture(devices, workflow_path)
                .await
                .map_err(|source| hook_error(plugin, "prepare_capture", source))?;
        }
        Ok(())
    }

    pub async fn start_trigger_loop(&self, capture: CaptureCallback) -> Result<(), HookError> {
        debug!(hook = "start_trigger_loop", "running hooks");
        for plugin in &self.plugins {
            plugin
                .on_start_trigger_loop(Arc::clone(&capture))
                .await
                .map_err(|source| hook_error(plugin, "start_trigger_loop", source))?;
        }
        Ok(())
    }

    pub async fn capture(
        &self,
        devices: &[Arc<dyn Device>],
        workflow_path: &Path,
    ) -> Result<(), HookError> {
        debug!(hook = "capture", "running hooks");
        for plugin in &self.plugins {
            plugin
                .on_capture(devices, workflow_path)
                .await
                .map_err(|source| hook_error(plugin, "capture", source))?;
        }
        Ok(())
    }

    pub async fn stop_trigger_loop(&self) -> Result<(), HookError> {
        debug!(hook = "stop_trigger_loop", "running hooks");
        for plugin in &self.plugins {
            plugin
                .on_stop_trigger_loop()
                .await
                .map_err(|source| hook_error(plugin, "stop_trigger_loop", source))?;
        }
        Ok(())
    }

    pub async fn finish_capture(
        &self,
        devices: &[Arc<dyn Device>],
        workflow_path: &Path,
    ) -> Result<(), HookError> {
        debug!(hook = "finish_capture", "running hooks");
        for plugin in &self.plugins {
            plugin
                .on_finish_capture(devices, workflow_path)
                .await
                .map_err(|source| hook_error(plugin, "finish_capture", source))?;
        }
        Ok(())
    }

    pub async fn process(&self, workflow_path: &Path) -> Result<(), HookError> {
        debug!(hook = "process", "running hooks");
        for plugin in &self.plugins {
            plugin
                .on_process(workflow_path)
                .await
                .map_err(|source| hook_error(plugin, "process", source))?;
        }
        Ok(())
    }

    pub async fn output(&self, workflow_path: &Path) -> Result<(), HookError> {
        debug!(hook = "output", "running hooks");
        for plugin in &self.plugins {
            plugin
                .on_output(workflow_path)
                .await
                .map_err(|source| hook_error(plugin, "output", source))?;
        }
        Ok(())
    }
}

fn hook_error(plugin: &Arc<dyn HookPlugin>, hook: &'static str, source: anyhow::Error) -> HookError {
    HookError {
        plugin: plugin.name().to_string(),
        hook,
        source,
    }
}
