//! The workflow aggregate - drives one book-digitization session through
//! prepare, capture, finish, process and output.
//!
//! Lifecycle methods are invoked by an external caller (HTTP layer or CLI);
//! `prepare_capture` additionally arms the trigger loop so attached
//! hardware can fire `capture` rounds on its own. Only capture rounds are
//! serialized internally (per-instance capture lock); running other
//! lifecycle methods concurrently from several callers on one workflow is
//! the caller's responsibility.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RigConfig;
use crate::device::{Device, DeviceResolver};
use crate::dispatch;
use crate::errors::{DeviceError, WorkflowError};
use crate::hooks::{CaptureCallback, HookPipeline, HookPlugin};
use crate::pagination;

/// Pipeline stage a workflow is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    None,
    Capture,
    Process,
    Output,
    Transfer,
}

#[derive(Debug, Default)]
struct WorkflowState {
    step: Step,
    step_done: bool,
    capture_start: Option<DateTime<Utc>>,
    pages_shot: usize,
    active: bool,
    prepared: bool,
}

/// Serializable snapshot of a workflow's lifecycle state, consumed by the
/// external persistence and HTTP collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub id: Uuid,
    pub path: PathBuf,
    pub step: Step,
    pub step_done: bool,
    pub capture_start: Option<DateTime<Utc>>,
    pub pages_shot: usize,
    pub active: bool,
    pub prepared: bool,
}

pub struct Workflow {
    id: Uuid,
    path: PathBuf,
    config: RigConfig,
    resolver: Arc<dyn DeviceResolver>,
    hooks: HookPipeline,
    /// Lazily resolved device cache; dropped when any cached device reports
    /// disconnection.
    devices: Mutex<Option<Vec<Arc<dyn Device>>>>,
    state: Mutex<WorkflowState>,
    /// Serializes whole capture rounds on this workflow. Owned per
    /// instance, held for the full duration of one `capture` call.
    capture_lock: Mutex<()>,
}

impl Workflow {
    /// Opens the workflow at `path`, creating the directory if absent.
    /// `pages_shot` is seeded from the raw files already on disk.
    pub fn open(
        path: impl Into<PathBuf>,
        config: RigConfig,
        resolver: Arc<dyn DeviceResolver>,
        plugins: Vec<Arc<dyn HookPlugin>>,
    ) -> Result<Arc<Self>, WorkflowError> {
        let path = path.into();
        info!(path = %path.display(), "initializing workflow");
        if !path.exists() {
            std::fs::create_dir_all(&path).map_err(|source| WorkflowError::Io {
                path: path.clone(),
                source,
            })?;
        }
        let pages_shot = pagination::list_raw_files(&path)
            .map_err(|source| WorkflowError::Io {
                path: pagination::raw_dir(&path),
                source,
            })?
            .len();

        Ok(Arc::new(Self {
            id: Uuid::new_v4(),
            path,
            config,
            resolver,
            hooks: HookPipeline::new(plugins),
            devices: Mutex::new(None),
            state: Mutex::new(WorkflowState {
                pages_shot,
                ..Default::default()
            }),
            capture_lock: Mutex::new(()),
        }))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    /// Restore the pipeline position recorded by the external persistence
    /// layer when re-opening an existing workflow.
    pub async fn restore_step(&self, step: Step, step_done: bool) {
        let mut state = self.state.lock().await;
        state.step = step;
        state.step_done = step_done;
    }

    pub async fn status(&self) -> WorkflowStatus {
        let state = self.state.lock().await;
        WorkflowStatus {
            id: self.id,
            path: self.path.clone(),
            step: state.step,
            step_done: state.step_done,
            capture_start: state.capture_start,
            pages_shot: state.pages_shot,
            active: state.active,
            prepared: state.prepared,
        }
    }

    /// Sorted listing of the raw capture files.
    pub fn raw_files(&self) -> Result<Vec<PathBuf>, WorkflowError> {
        pagination::list_raw_files(&self.path).map_err(|source| WorkflowError::Io {
            path: pagination::raw_dir(&self.path),
            source,
        })
    }

    /// Sorted listing of the generated output files.
    pub fn out_files(&self) -> Result<Vec<PathBuf>, WorkflowError> {
        pagination::list_out_files(&self.path).map_err(|source| WorkflowError::Io {
            path: pagination::out_dir(&self.path),
            source,
        })
    }

    /// The connected devices, resolved on first access and cached.
    ///
    /// When any cached device reports disconnection the whole list is
    /// discarded and re-resolved; an empty resolution fails.
    pub async fn devices(&self) -> Result<Vec<Arc<dyn Device>>, WorkflowError> {
        let mut cache = self.devices.lock().await;
        if cache
            .as_ref()
            .is_some_and(|devices| devices.iter().any(|dev| !dev.connected()))
        {
            warn!("at least one device has been disconnected, discarding cached device list");
            *cache = None;
        }
        let devices = match cache.take() {
            Some(devices) => devices,
            None => self.resolver.resolve().await?,
        };
        if devices.is_empty() {
            return Err(DeviceError::NoneFound.into());
        }
        *cache = Some(devices.clone());
        Ok(devices)
    }

    /// Arms the devices and the trigger loop for a capture session.
    pub async fn prepare_capture(self: &Arc<Self>) -> Result<(), WorkflowError> {
        info!(workflow = %self.id, "preparing capture");
        {
            let mut state = self.state.lock().await;
            state.step = Step::Capture;
            state.step_done = false;
        }
        let devices = self.devices().await?;
        // Interleaving needs a role per station; a lone device may shoot a
        // flat sequence without one.
        if devices.len() > 1 {
            if let Some(unset) = devices.iter().find(|dev| dev.target_page().is_none()) {
                return Err(DeviceError::MissingTargetPage {
                    device: unset.name().to_string(),
                }
                .into());
            }
        }
        if self.config.device.flip_target_pages && devices.len() == 2 {
            let (first, second) = (devices[0].target_page(), devices[1].target_page());
            devices[0].set_target_page(second);
            devices[1].set_target_page(first);
        }

        dispatch::run_on_all("prepare_capture", devices.clone(), devices.len(), |dev| {
            let path = self.path.clone();
            async move { dev.prepare_capture(&path).await }
        })
        .await?;

        self.hooks.prepare_capture(&devices, &self.path).await?;
        self.hooks.start_trigger_loop(self.capture_callback()).await?;

        let mut state = self.state.lock().await;
        state.prepared = true;
        state.active = true;
        Ok(())
    }

    /// Shoots one capture round on every device.
    ///
    /// Rounds are strictly serialized by the capture lock. With `retake`
    /// the newest file per device is removed first, undoing exactly one
    /// prior round, and the page counter does not advance.
    pub async fn capture(&self, retake: bool) -> Result<(), WorkflowError> {
        // One guard spans the whole round and is dropped on every exit path.
        let _round = self.capture_lock.lock().await;
        {
            let mut state = self.state.lock().await;
            if state.capture_start.is_none() {
                state.capture_start = Some(Utc::now());
            }
        }
        info!(workflow = %self.id, retake, "triggering capture");
        let devices = self.devices().await?;

        let raw = pagination::raw_dir(&self.path);
        if !raw.exists() {
            std::fs::create_dir_all(&raw).map_err(|source| WorkflowError::Io {
                path: raw.clone(),
                source,
            })?;
        }

        if retake {
            let files = self.raw_files()?;
            let keep = files.len().saturating_sub(devices.len());
            for stale in &files[keep..] {
                std::fs::remove_file(stale).map_err(|source| WorkflowError::Io {
                    path: stale.clone(),
                    source,
                })?;
            }
        }

        // All destinations are derived from the same listing so that an
        // odd/even pair interleaves no matter which station shoots first.
        let pages_shot = self.state.lock().await.pages_shot;
        let files = self.raw_files()?;
        let mut shots = Vec::with_capacity(devices.len());
        for dev in &devices {
            let destination = pagination::next_capture_path(
                &self.path,
                &files,
                pages_shot,
                dev.target_page(),
                dev.file_extension(),
            );
            shots.push((Arc::clone(dev), destination));
        }

        let worker_limit = if self.config.device.parallel_capture { 2 } else { 1 };
        dispatch::run_on_all("capture", shots, worker_limit, |(dev, destination)| {
            async move { dev.capture(&destination).await }
        })
        .await?;

        self.hooks.capture(&devices, &self.path).await?;

        if !retake {
            let mut state = self.state.lock().await;
            state.pages_shot += devices.len();
        }
        Ok(())
    }

    /// Tears the capture session down and stops the trigger loop.
    pub async fn finish_capture(&self) -> Result<(), WorkflowError> {
        info!(workflow = %self.id, "finishing capture");
        let devices = self.devices().await?;
        dispatch::run_on_all("finish_capture", devices.clone(), devices.len(), |dev| {
            async move { dev.finish_capture().await }
        })
        .await?;

        self.hooks.finish_capture(&devices, &self.path).await?;
        self.hooks.stop_trigger_loop().await?;

        let mut state = self.state.lock().await;
        state.step_done = true;
        state.prepared = false;
        state.active = false;
        Ok(())
    }

    /// Runs the postprocessing hooks over the captured pages.
    pub async fn process(&self) -> Result<(), WorkflowError> {
        {
            let mut state = self.state.lock().await;
            state.step = Step::Process;
            state.step_done = false;
        }
        info!(workflow = %self.id, "starting postprocessing");
        self.hooks.process(&self.path).await?;
        info!(workflow = %self.id, "done with postprocessing");
        self.state.lock().await.step_done = true;
        Ok(())
    }

    /// Runs the output hooks, creating `out/` on demand.
    pub async fn output(&self) -> Result<(), WorkflowError> {
        {
            let mut state = self.state.lock().await;
            state.step = Step::Output;
            state.step_done = false;
        }
        info!(workflow = %self.id, "generating output files");
        let out = pagination::out_dir(&self.path);
        if !out.exists() {
            std::fs::create_dir_all(&out).map_err(|source| WorkflowError::Io {
                path: out.clone(),
                source,
            })?;
        }
        self.hooks.output(&self.path).await?;
        info!(workflow = %self.id, "done generating output files");
        self.state.lock().await.step_done = true;
        Ok(())
    }

    fn capture_callback(self: &Arc<Self>) -> CaptureCallback {
        let workflow = Arc::clone(self);
        let callback: CaptureCallback = Arc::new(move || {
            let workflow = Arc::clone(&workflow);
            Box::pin(async move { workflow.capture(false).await })
        });
        callback
    }
}
