//! Trigger bridge - connects external trigger hardware (footswitch, keypad)
//! to a workflow's capture method.
//!
//! The loop is the only long-lived background task in the crate and the
//! only one with an explicit cancellation contract: it checks a stop flag
//! once per poll interval, and `TriggerLoop::stop` does not return before
//! the task has exited, so no capture callback can fire after teardown.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::DeviceError;
use crate::hooks::{CaptureCallback, HookPlugin};

/// A pollable momentary switch.
pub trait TriggerSource: Send + Sync {
    fn name(&self) -> &str;

    /// Current state of the switch.
    fn is_pressed(&self) -> Result<bool, DeviceError>;
}

/// Enumerates the trigger hardware currently attached to the rig.
pub trait TriggerSourceProvider: Send + Sync {
    fn enumerate(&self) -> Result<Vec<Arc<dyn TriggerSource>>, DeviceError>;
}

/// Handle to a running trigger loop task.
pub struct TriggerLoop {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TriggerLoop {
    /// Spawns the polling loop. Fails with [`DeviceError::NoTriggerSource`]
    /// when `sources` is empty rather than starting a loop that can never
    /// fire.
    pub fn start(
        sources: Vec<Arc<dyn TriggerSource>>,
        capture: CaptureCallback,
        poll_interval: Duration,
    ) -> Result<Self, DeviceError> {
        if sources.is_empty() {
            return Err(DeviceError::NoTriggerSource);
        }
        debug!(sources = sources.len(), "starting trigger loop");
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(poll_sources(sources, capture, poll_interval, stop_rx));
        Ok(Self { stop_tx, handle })
    }

    /// Signals the loop to exit and waits until the task has terminated.
    pub async fn stop(self) {
        debug!("stopping trigger loop");
        let _ = self.stop_tx.send(true);
        if self.handle.await.is_err() {
            warn!("trigger loop task panicked during shutdown");
        }
    }
}

/// Polls every source for a press-then-release gesture and fires the
/// capture callback once per completed gesture.
async fn poll_sources(
    sources: Vec<Arc<dyn TriggerSource>>,
    capture: CaptureCallback,
    poll_interval: Duration,
    stop_rx: watch::Receiver<bool>,
) {
    while !*stop_rx.borrow() {
        for source in &sources {
            match source.is_pressed() {
                Ok(true) => {
                    // Wait for the release so one press fires exactly one
                    // capture round. A read error here is not a release:
                    // the button may still be held, so the gesture is
                    // abandoned without firing.
                    let released = loop {
                        if *stop_rx.borrow() {
                            return;
                        }
                        match source.is_pressed() {
                            Ok(true) => tokio::time::sleep(poll_interval).await,
                            Ok(false) => break true,
                            Err(error) => {
                                warn!(source = source.name(), %error, "trigger source read failed, abandoning gesture");
                                break false;
                            }
                        }
                    };
                    if !released {
                        continue;
                    }
                    if *stop_rx.borrow() {
                        return;
                    }
                    if let Err(error) = capture().await {
                        warn!(%error, "triggered capture failed");
                    }
                }
                Ok(false) => {}
                Err(error) => {
                    warn!(source = source.name(), %error, "trigger source read failed");
                }
            }
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Hook plugin that arms a [`TriggerLoop`] on `start_trigger_loop` and
/// tears it down on `stop_trigger_loop`.
pub struct SwitchTriggerPlugin {
    provider: Arc<dyn TriggerSourceProvider>,
    poll_interval: Duration,
    running: Mutex<Option<TriggerLoop>>,
}

impl SwitchTriggerPlugin {
    pub fn new(provider: Arc<dyn TriggerSourceProvider>, poll_interval: Duration) -> Self {
        Self {
            provider,
            poll_interval,
            running: Mutex::new(None),
        }
    }
}

#[async_trait]
impl HookPlugin for SwitchTriggerPlugin {
    fn name(&self) -> &str {
        "switch-trigger"
    }

    async fn on_start_trigger_loop(&self, capture: CaptureCallback) -> anyhow::Result<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            anyhow::bail!("trigger loop is already running");
        }
        let sources = self.provider.enumerate()?;
        *running = Some(TriggerLoop::start(sources, capture, self.poll_interval)?);
        Ok(())
    }

    async fn on_stop_trigger_loop(&self) -> anyhow::Result<()> {
        if let Some(active) = self.running.lock().await.take() {
            active.stop().await;
        }
        Ok(())
    }
}
