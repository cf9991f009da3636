use crate::clipboard::{
    load_clipboard, save_clipboard, ClipboardStore, CLIPBOARD_FILE,
};
use crate::gesture::{ButtonEvent, GestureDetector, MouseButton};
use crate::launcher::{ClipboardDevice, LaunchTarget, SystemClipboard, SystemLauncher};
use crate::menu::{build_sections, MenuItem, Section, SectionKind};
use crate::settings::Settings;
use crate::usage::{load_usage, save_usage, UsageStore, USAGE_FILE};
use anyhow::anyhow;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const CLIPBOARD_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Everything the worker thread reacts to, hook traffic and selections
/// alike, so all store mutation happens in one place.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    Button(ButtonEvent),
    PointerMoved { x: f64, y: f64 },
    Select(Box<MenuItem>),
}

pub trait InputBackend: Send {
    fn install(&mut self, sender: Sender<ServiceEvent>) -> anyhow::Result<()>;
    fn uninstall(&mut self) -> anyhow::Result<()>;
    fn is_installed(&self) -> bool;
}

/// Receives the assembled menu. Rendering lives outside this crate; the
/// default implementation only reports through the log.
pub trait Frontend: Send + Sync {
    fn show_menu(&self, position: (f64, f64), sections: &[Section]);
    fn launch_failed(&self, label: &str);
}

#[derive(Debug, Default)]
pub struct LogFrontend;

impl Frontend for LogFrontend {
    fn show_menu(&self, position: (f64, f64), sections: &[Section]) {
        let items: usize = sections.iter().map(|s| s.items.len()).sum();
        tracing::info!(
            x = position.0,
            y = position.1,
            sections = sections.len(),
            items,
            "menu ready"
        );
    }

    fn launch_failed(&self, label: &str) {
        tracing::warn!(label, "launch failed");
    }
}

/// Where the two history files live.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub usage: String,
    pub clips: String,
}

impl StorePaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            usage: dir.join(USAGE_FILE).to_string_lossy().into_owned(),
            clips: dir.join(CLIPBOARD_FILE).to_string_lossy().into_owned(),
        }
    }
}

/// Sends selections into the running worker. Cheap to clone and safe to
/// hand to a frontend on another thread.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: Sender<ServiceEvent>,
}

impl ServiceHandle {
    /// Returns `false` when the service has stopped in the meantime.
    pub fn select(&self, item: MenuItem) -> bool {
        self.tx.send(ServiceEvent::Select(Box::new(item))).is_ok()
    }
}

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: Sender<()>,
    join: JoinHandle<()>,
}

struct WorkerContext {
    settings: Settings,
    paths: StorePaths,
    usage: Arc<Mutex<UsageStore>>,
    clips: Arc<Mutex<ClipboardStore>>,
    launcher: Arc<dyn LaunchTarget>,
    frontend: Arc<dyn Frontend>,
    clipboard: Arc<Mutex<Box<dyn ClipboardDevice>>>,
}

/// Ties the input hook, the gesture detector, both stores and the
/// frontend together. One worker thread owns the detector and performs
/// every store mutation, so nothing here needs finer locking.
pub struct LauncherService {
    settings: Settings,
    paths: StorePaths,
    usage: Arc<Mutex<UsageStore>>,
    clips: Arc<Mutex<ClipboardStore>>,
    backend: Box<dyn InputBackend>,
    launcher: Arc<dyn LaunchTarget>,
    frontend: Arc<dyn Frontend>,
    clipboard: Arc<Mutex<Box<dyn ClipboardDevice>>>,
    worker: Option<WorkerHandle>,
    event_tx: Option<Sender<ServiceEvent>>,
}

impl LauncherService {
    pub fn new(settings: Settings, paths: StorePaths) -> Self {
        Self::with_adapters(
            settings,
            paths,
            Box::new(RdevInputBackend::default()),
            Arc::new(SystemLauncher),
            Arc::new(LogFrontend),
            Box::new(SystemClipboard::new()),
        )
    }

    pub fn with_adapters(
        settings: Settings,
        paths: StorePaths,
        backend: Box<dyn InputBackend>,
        launcher: Arc<dyn LaunchTarget>,
        frontend: Arc<dyn Frontend>,
        clipboard: Box<dyn ClipboardDevice>,
    ) -> Self {
        let usage = load_usage(&paths.usage).unwrap_or_else(|err| {
            tracing::error!(?err, "failed to load usage history, starting empty");
            UsageStore::default()
        });
        let clips = load_clipboard(&paths.clips)
            .map(|entries| ClipboardStore::from_entries(entries, settings.max_clipboard_history))
            .unwrap_or_else(|err| {
                tracing::error!(?err, "failed to load clipboard history, starting empty");
                ClipboardStore::new(settings.max_clipboard_history)
            });

        Self {
            settings,
            paths,
            usage: Arc::new(Mutex::new(usage)),
            clips: Arc::new(Mutex::new(clips)),
            backend,
            launcher,
            frontend,
            clipboard: Arc::new(Mutex::new(clipboard)),
            worker: None,
            event_tx: None,
        }
    }

    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }

        let (event_tx, event_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();

        if let Err(err) = self.backend.install(event_tx.clone()) {
            tracing::error!(?err, "failed to install input hook");
            return;
        }

        let ctx = WorkerContext {
            settings: self.settings.clone(),
            paths: self.paths.clone(),
            usage: Arc::clone(&self.usage),
            clips: Arc::clone(&self.clips),
            launcher: Arc::clone(&self.launcher),
            frontend: Arc::clone(&self.frontend),
            clipboard: Arc::clone(&self.clipboard),
        };
        let join = thread::spawn(move || worker_loop(ctx, event_rx, stop_rx));
        self.worker = Some(WorkerHandle { stop_tx, join });
        self.event_tx = Some(event_tx);
    }

    /// Uninstalls the hook, drains the worker and flushes unsaved history.
    pub fn stop(&mut self) {
        if self.worker.is_none() && !self.backend.is_installed() {
            return;
        }

        if let Err(err) = self.backend.uninstall() {
            tracing::error!(?err, "failed to uninstall input hook");
        }

        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.join();
        }
        self.event_tx = None;
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Handle for the current run; `None` while stopped. A handle taken
    /// before a restart goes stale and its sends report `false`.
    pub fn handle(&self) -> Option<ServiceHandle> {
        self.event_tx.clone().map(|tx| ServiceHandle { tx })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn usage_store(&self) -> Arc<Mutex<UsageStore>> {
        Arc::clone(&self.usage)
    }

    pub fn clips_store(&self) -> Arc<Mutex<ClipboardStore>> {
        Arc::clone(&self.clips)
    }
}

impl Drop for LauncherService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(ctx: WorkerContext, event_rx: Receiver<ServiceEvent>, stop_rx: Receiver<()>) {
    let mut detector = GestureDetector::new(ctx.settings.threshold(), ctx.settings.debounce());
    let mut pointer = (0.0_f64, 0.0_f64);
    let mut last_clipboard_poll = Instant::now();

    loop {
        if stop_rx.try_recv().is_ok() {
            break;
        }
        match event_rx.recv_timeout(POLL_INTERVAL) {
            Ok(ServiceEvent::Button(event)) => {
                if detector.handle(event) {
                    tracing::debug!(x = pointer.0, y = pointer.1, "chord recognized");
                    show_menu(&ctx, pointer);
                }
            }
            Ok(ServiceEvent::PointerMoved { x, y }) => {
                pointer = (x, y);
            }
            Ok(ServiceEvent::Select(item)) => {
                handle_select(&ctx, *item);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if last_clipboard_poll.elapsed() >= CLIPBOARD_POLL_INTERVAL {
            poll_clipboard(&ctx);
            last_clipboard_poll = Instant::now();
        }
    }

    // Final flush so nothing dirty outlives the worker.
    save_usage_store(&ctx);
    save_clip_store(&ctx);
}

fn show_menu(ctx: &WorkerContext, pointer: (f64, f64)) {
    let now = Utc::now();
    let usage = match ctx.usage.lock() {
        Ok(guard) => guard,
        Err(err) => {
            tracing::error!(?err, "failed to lock usage store");
            return;
        }
    };
    let clips = match ctx.clips.lock() {
        Ok(guard) => guard,
        Err(err) => {
            tracing::error!(?err, "failed to lock clipboard store");
            return;
        }
    };
    let sections = build_sections(&ctx.settings, &usage, &clips, now);
    drop(clips);
    drop(usage);

    ctx.frontend.show_menu(pointer, &sections);
}

fn handle_select(ctx: &WorkerContext, item: MenuItem) {
    let now = Utc::now();
    match item.kind {
        SectionKind::Clipboard => {
            let written = match ctx.clipboard.lock() {
                Ok(mut device) => device.write_text(&item.key),
                Err(_) => Err(anyhow!("clipboard device lock poisoned")),
            };
            match written {
                Ok(()) => {
                    if let Ok(mut clips) = ctx.clips.lock() {
                        clips.record_use(&item.key, now);
                    }
                    save_clip_store(ctx);
                }
                Err(err) => tracing::error!(?err, "failed to copy entry to clipboard"),
            }
        }
        _ => match ctx.launcher.launch(&item.key, &item.args) {
            Ok(()) => {
                if let Ok(mut usage) = ctx.usage.lock() {
                    usage.record_launch(&item.key, &item.label, now);
                }
                save_usage_store(ctx);
            }
            Err(err) => {
                // A failed launch leaves the usage history untouched.
                tracing::error!(?err, path = %item.key, "failed to launch item");
                ctx.frontend.launch_failed(&item.label);
            }
        },
    }
}

fn poll_clipboard(ctx: &WorkerContext) {
    let text = match ctx.clipboard.lock() {
        Ok(mut device) => device.read_text(),
        Err(err) => {
            tracing::error!(?err, "failed to lock clipboard device");
            None
        }
    };
    let Some(text) = text else {
        return;
    };

    let changed = match ctx.clips.lock() {
        Ok(mut clips) => clips.observe(&text, Utc::now()),
        Err(err) => {
            tracing::error!(?err, "failed to lock clipboard store");
            false
        }
    };
    if changed {
        // Content stays out of the log; clipboard text can be sensitive.
        tracing::debug!(chars = text.chars().count(), "captured clipboard text");
        save_clip_store(ctx);
    }
}

fn save_usage_store(ctx: &WorkerContext) {
    let mut usage = match ctx.usage.lock() {
        Ok(guard) => guard,
        Err(err) => {
            tracing::error!(?err, "failed to lock usage store");
            return;
        }
    };
    if !usage.dirty() {
        return;
    }
    match save_usage(&ctx.paths.usage, &usage) {
        Ok(()) => usage.mark_saved(),
        Err(err) => tracing::error!(?err, "failed to save usage history"),
    }
}

fn save_clip_store(ctx: &WorkerContext) {
    let mut clips = match ctx.clips.lock() {
        Ok(guard) => guard,
        Err(err) => {
            tracing::error!(?err, "failed to lock clipboard store");
            return;
        }
    };
    if !clips.dirty() {
        return;
    }
    match save_clipboard(&ctx.paths.clips, clips.entries()) {
        Ok(()) => clips.mark_saved(),
        Err(err) => tracing::error!(?err, "failed to save clipboard history"),
    }
}

fn map_event(event: &rdev::Event) -> Option<ServiceEvent> {
    let button = |button: MouseButton, pressed: bool| {
        ServiceEvent::Button(ButtonEvent {
            button,
            pressed,
            at: Instant::now(),
        })
    };
    match event.event_type {
        rdev::EventType::ButtonPress(rdev::Button::Left) => Some(button(MouseButton::Left, true)),
        rdev::EventType::ButtonRelease(rdev::Button::Left) => {
            Some(button(MouseButton::Left, false))
        }
        rdev::EventType::ButtonPress(rdev::Button::Right) => {
            Some(button(MouseButton::Right, true))
        }
        rdev::EventType::ButtonRelease(rdev::Button::Right) => {
            Some(button(MouseButton::Right, false))
        }
        rdev::EventType::MouseMove { x, y } => Some(ServiceEvent::PointerMoved { x, y }),
        _ => None,
    }
}

/// Global [`rdev`] listener. `rdev::listen` blocks its thread for good, so
/// uninstalling only detaches the callback via the alive flag; the next
/// install spawns a fresh listener.
#[derive(Default)]
pub struct RdevInputBackend {
    alive: Option<Arc<AtomicBool>>,
}

impl InputBackend for RdevInputBackend {
    fn install(&mut self, sender: Sender<ServiceEvent>) -> anyhow::Result<()> {
        if self.alive.is_some() {
            return Ok(());
        }

        let alive = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&alive);
        thread::spawn(move || loop {
            if !flag.load(Ordering::Acquire) {
                break;
            }
            let callback_flag = Arc::clone(&flag);
            let callback_sender = sender.clone();
            let result = rdev::listen(move |event| {
                if !callback_flag.load(Ordering::Acquire) {
                    return;
                }
                if let Some(service_event) = map_event(&event) {
                    let _ = callback_sender.send(service_event);
                }
            });
            match result {
                Ok(()) => tracing::warn!("Mouse listener exited unexpectedly. Restarting shortly"),
                Err(e) => tracing::warn!("Mouse listener failed: {:?}. Retrying shortly", e),
            }
            thread::sleep(Duration::from_millis(500));
        });

        self.alive = Some(alive);
        Ok(())
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        if let Some(alive) = self.alive.take() {
            alive.store(false, Ordering::Release);
        }
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.alive.is_some()
    }
}

#[derive(Clone)]
pub struct MockInputBackend {
    state: Arc<MockInputState>,
}

#[derive(Default)]
struct MockInputState {
    install_count: AtomicUsize,
    uninstall_count: AtomicUsize,
    sender: Mutex<Option<Sender<ServiceEvent>>>,
}

impl MockInputBackend {
    pub fn new() -> (Self, MockInputHandle) {
        let state = Arc::new(MockInputState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockInputHandle { state },
        )
    }
}

impl InputBackend for MockInputBackend {
    fn install(&mut self, sender: Sender<ServiceEvent>) -> anyhow::Result<()> {
        let mut guard = self.state.sender.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_none() {
            self.state.install_count.fetch_add(1, Ordering::SeqCst);
            *guard = Some(sender);
        }
        Ok(())
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        let mut guard = self.state.sender.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_some() {
            self.state.uninstall_count.fetch_add(1, Ordering::SeqCst);
        }
        *guard = None;
        Ok(())
    }

    fn is_installed(&self) -> bool {
        match self.state.sender.lock() {
            Ok(guard) => guard.is_some(),
            Err(_) => false,
        }
    }
}

pub struct MockInputHandle {
    state: Arc<MockInputState>,
}

impl MockInputHandle {
    pub fn install_count(&self) -> usize {
        self.state.install_count.load(Ordering::SeqCst)
    }

    pub fn uninstall_count(&self) -> usize {
        self.state.uninstall_count.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: ServiceEvent) -> bool {
        match self.state.sender.lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|sender| sender.send(event).is_ok())
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}
