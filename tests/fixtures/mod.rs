//! Shared test doubles: recording devices, a fixed resolver, recording
//! hook plugins and a scriptable trigger switch. No real hardware, no side
//! effects beyond the TempDir the test owns.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bookrig::device::{Device, DeviceResolver, TargetPage};
use bookrig::errors::DeviceError;
use bookrig::hooks::{CaptureCallback, HookPlugin};
use bookrig::trigger::{TriggerSource, TriggerSourceProvider};

/// Recording mock device. Captures write a marker file at the destination
/// so the raw directory reflects what a camera would have produced.
pub struct MockDevice {
    name: String,
    target_page: Mutex<Option<TargetPage>>,
    connected: AtomicBool,
    fail_capture: AtomicBool,
    capture_delay: Duration,
    pub prepare_calls: Mutex<Vec<PathBuf>>,
    pub capture_calls: Mutex<Vec<PathBuf>>,
    pub capture_spans: Mutex<Vec<(Instant, Instant)>>,
    pub finish_calls: Mutex<usize>,
}

impl MockDevice {
    pub fn new(name: &str, target_page: Option<TargetPage>) -> Arc<Self> {
        Self::with_capture_delay(name, target_page, Duration::ZERO)
    }

    pub fn with_capture_delay(
        name: &str,
        target_page: Option<TargetPage>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            target_page: Mutex::new(target_page),
            connected: AtomicBool::new(true),
            fail_capture: AtomicBool::new(false),
            capture_delay: delay,
            prepare_calls: Mutex::new(Vec::new()),
            capture_calls: Mutex::new(Vec::new()),
            capture_spans: Mutex::new(Vec::new()),
            finish_calls: Mutex::new(0),
        })
    }

    pub fn as_device(self: &Arc<Self>) -> Arc<dyn Device> {
        Arc::clone(self) as Arc<dyn Device>
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_fail_capture(&self, fail: bool) {
        self.fail_capture.store(fail, Ordering::SeqCst);
    }

    pub fn captured_stems(&self) -> Vec<String> {
        self.capture_calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect()
    }
}

#[async_trait]
impl Device for MockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn target_page(&self) -> Option<TargetPage> {
        *self.target_page.lock().unwrap()
    }

    fn set_target_page(&self, target: Option<TargetPage>) {
        *self.target_page.lock().unwrap() = target;
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn prepare_capture(&self, workflow_path: &Path) -> Result<(), DeviceError> {
        self.prepare_calls
            .lock()
            .unwrap()
            .push(workflow_path.to_path_buf());
        Ok(())
    }

    async fn capture(&self, destination: &Path) -> Result<(), DeviceError> {
        let started = Instant::now();
        if !self.capture_delay.is_zero() {
            tokio::time::sleep(self.capture_delay).await;
        }
        if self.fail_capture.load(Ordering::SeqCst) {
            return Err(DeviceError::Operation {
                device: self.name.clone(),
                message: "shutter failure injected".into(),
            });
        }
        std::fs::write(destination, b"raw-image")?;
        self.capture_calls
            .lock()
            .unwrap()
            .push(destination.to_path_buf());
        self.capture_spans
            .lock()
            .unwrap()
            .push((started, Instant::now()));
        Ok(())
    }

    async fn finish_capture(&self) -> Result<(), DeviceError> {
        *self.finish_calls.lock().unwrap() += 1;
        Ok(())
    }
}

/// Resolver that hands out a fixed device list and counts resolutions.
pub struct FixedResolver {
    devices: Mutex<Vec<Arc<dyn Device>>>,
    pub resolve_calls: Mutex<usize>,
}

impl FixedResolver {
    pub fn new(devices: Vec<Arc<dyn Device>>) -> Arc<Self> {
        Arc::new(Self {
            devices: Mutex::new(devices),
            resolve_calls: Mutex::new(0),
        })
    }

    pub fn set_devices(&self, devices: Vec<Arc<dyn Device>>) {
        *self.devices.lock().unwrap() = devices;
    }
}

#[async_trait]
impl DeviceResolver for FixedResolver {
    async fn resolve(&self) -> Result<Vec<Arc<dyn Device>>, DeviceError> {
        *self.resolve_calls.lock().unwrap() += 1;
        Ok(self.devices.lock().unwrap().clone())
    }
}

/// Plugin that records which hooks fired, in order, and can be told to
/// fail on one of them.
pub struct RecordingPlugin {
    name: String,
    pub fired: Mutex<Vec<String>>,
    pub fail_on: Mutex<Option<String>>,
    pub trigger_callback: Mutex<Option<CaptureCallback>>,
}

impl RecordingPlugin {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fired: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
            trigger_callback: Mutex::new(None),
        })
    }

    pub fn as_plugin(self: &Arc<Self>) -> Arc<dyn HookPlugin> {
        Arc::clone(self) as Arc<dyn HookPlugin>
    }

    pub fn fail_on(&self, hook: &str) {
        *self.fail_on.lock().unwrap() = Some(hook.to_string());
    }

    pub fn fired_hooks(&self) -> Vec<String> {
        self.fired.lock().unwrap().clone()
    }

    fn record(&self, hook: &str) -> anyhow::Result<()> {
        self.fired.lock().unwrap().push(hook.to_string());
        if self.fail_on.lock().unwrap().as_deref() == Some(hook) {
            anyhow::bail!("hook '{hook}' failure injected");
        }
        Ok(())
    }
}

#[async_trait]
impl HookPlugin for RecordingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_prepare_capture(
        &self,
        _devices: &[Arc<dyn Device>],
        _workflow_path: &Path,
    ) -> anyhow::Result<()> {
        self.record("prepare_capture")
    }

    async fn on_start_trigger_loop(&self, capture: CaptureCallback) -> anyhow::Result<()> {
        *self.trigger_callback.lock().unwrap() = Some(capture);
        self.record("start_trigger_loop")
    }

    async fn on_capture(
        &self,
        _devices: &[Arc<dyn Device>],
        _workflow_path: &Path,
    ) -> anyhow::Result<()> {
        self.record("capture")
    }

    async fn on_stop_trigger_loop(&self) -> anyhow::Result<()> {
        self.record("stop_trigger_loop")
    }

    async fn on_finish_capture(
        &self,
        _devices: &[Arc<dyn Device>],
        _workflow_path: &Path,
    ) -> anyhow::Result<()> {
        self.record("finish_capture")
    }

    async fn on_process(&self, _workflow_path: &Path) -> anyhow::Result<()> {
        self.record("process")
    }

    async fn on_output(&self, _workflow_path: &Path) -> anyhow::Result<()> {
        self.record("output")
    }
}

/// Scriptable momentary switch.
pub struct MockSwitch {
    pressed: AtomicBool,
}

impl MockSwitch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pressed: AtomicBool::new(false),
        })
    }

    pub fn as_source(self: &Arc<Self>) -> Arc<dyn TriggerSource> {
        Arc::clone(self) as Arc<dyn TriggerSource>
    }

    pub fn press(&self) {
        self.pressed.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.pressed.store(false, Ordering::SeqCst);
    }
}

impl TriggerSource for MockSwitch {
    fn name(&self) -> &str {
        "mock-switch"
    }

    fn is_pressed(&self) -> Result<bool, DeviceError> {
        Ok(self.pressed.load(Ordering::SeqCst))
    }
}

/// Switch that replays a scripted sequence of reads in order. Once the
/// script is exhausted every further read reports released.
pub struct ScriptedSwitch {
    reads: Mutex<VecDeque<Result<bool, String>>>,
}

impl ScriptedSwitch {
    pub fn new(reads: Vec<Result<bool, String>>) -> Arc<Self> {
        Arc::new(Self {
            reads: Mutex::new(reads.into_iter().collect()),
        })
    }

    pub fn as_source(self: &Arc<Self>) -> Arc<dyn TriggerSource> {
        Arc::clone(self) as Arc<dyn TriggerSource>
    }
}

impl TriggerSource for ScriptedSwitch {
    fn name(&self) -> &str {
        "scripted-switch"
    }

    fn is_pressed(&self) -> Result<bool, DeviceError> {
        match self.reads.lock().unwrap().pop_front() {
            Some(Ok(state)) => Ok(state),
            Some(Err(message)) => Err(DeviceError::Operation {
                device: "scripted-switch".to_string(),
                message,
            }),
            None => Ok(false),
        }
    }
}

/// Provider returning a fixed set of switches, possibly none.
pub struct FixedSwitchProvider {
    sources: Vec<Arc<dyn TriggerSource>>,
}

impl FixedSwitchProvider {
    pub fn new(sources: Vec<Arc<dyn TriggerSource>>) -> Arc<Self> {
        Arc::new(Self { sources })
    }
}

impl TriggerSourceProvider for FixedSwitchProvider {
    fn enumerate(&self) -> Result<Vec<Arc<dyn TriggerSource>>, DeviceError> {
        Ok(self.sources.clone())
    }
}
