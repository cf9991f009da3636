use chord_launcher::clipboard::{load_clipboard, ClipEntry};
use chord_launcher::gesture::{ButtonEvent, MouseButton};
use chord_launcher::launcher::{ClipboardDevice, LaunchTarget};
use chord_launcher::menu::{MenuItem, Section, SectionKind};
use chord_launcher::service::{
    Frontend, LauncherService, MockInputBackend, MockInputHandle, ServiceEvent, StorePaths,
};
use chord_launcher::settings::{LaunchItem, Settings};
use chord_launcher::usage::load_usage;
use chrono::Utc;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::tempdir;

#[derive(Default)]
struct RecordingFrontend {
    menus: Arc<Mutex<Vec<((f64, f64), Vec<Section>)>>>,
    failures: Arc<Mutex<Vec<String>>>,
}

impl RecordingFrontend {
    fn menus(&self) -> Vec<((f64, f64), Vec<Section>)> {
        self.menus.lock().map(|m| m.clone()).unwrap_or_default()
    }

    fn failures(&self) -> Vec<String> {
        self.failures.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl Frontend for RecordingFrontend {
    fn show_menu(&self, position: (f64, f64), sections: &[Section]) {
        if let Ok(mut guard) = self.menus.lock() {
            guard.push((position, sections.to_vec()));
        }
    }

    fn launch_failed(&self, label: &str) {
        if let Ok(mut guard) = self.failures.lock() {
            guard.push(label.to_string());
        }
    }
}

struct RecordingLauncher {
    launches: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    fail: bool,
}

impl RecordingLauncher {
    fn succeeding() -> Self {
        Self {
            launches: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            launches: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    fn launches(&self) -> Vec<(String, Vec<String>)> {
        self.launches.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl LaunchTarget for RecordingLauncher {
    fn launch(&self, path: &str, args: &[String]) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("refused by test launcher");
        }
        if let Ok(mut guard) = self.launches.lock() {
            guard.push((path.to_string(), args.to_vec()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemoryClipboard {
    text: Arc<Mutex<Option<String>>>,
    written: Arc<Mutex<Vec<String>>>,
}

impl ClipboardDevice for MemoryClipboard {
    fn read_text(&mut self) -> Option<String> {
        self.text.lock().ok().and_then(|guard| guard.clone())
    }

    fn write_text(&mut self, text: &str) -> anyhow::Result<()> {
        if let Ok(mut guard) = self.written.lock() {
            guard.push(text.to_string());
        }
        if let Ok(mut guard) = self.text.lock() {
            *guard = Some(text.to_string());
        }
        Ok(())
    }
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

fn service_with(
    dir: &Path,
    settings: Settings,
    backend: MockInputBackend,
    launcher: Arc<RecordingLauncher>,
    frontend: Arc<RecordingFrontend>,
    clipboard: MemoryClipboard,
) -> LauncherService {
    LauncherService::with_adapters(
        settings,
        StorePaths::in_dir(dir),
        Box::new(backend),
        launcher,
        frontend,
        Box::new(clipboard),
    )
}

fn chord_press(handle: &MockInputHandle) {
    let at = Instant::now();
    handle.emit(ServiceEvent::Button(ButtonEvent {
        button: MouseButton::Left,
        pressed: true,
        at,
    }));
    handle.emit(ServiceEvent::Button(ButtonEvent {
        button: MouseButton::Right,
        pressed: true,
        at,
    }));
}

fn launch_row(key: &str, label: &str, args: &[&str]) -> MenuItem {
    MenuItem {
        label: label.to_string(),
        icon: None,
        key: key.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        kind: SectionKind::Pinned,
        quick_index: None,
        detail: None,
    }
}

#[test]
fn start_and_stop_are_idempotent() {
    let dir = tempdir().expect("create temp dir");
    let (backend, hook) = MockInputBackend::new();
    let mut service = service_with(
        dir.path(),
        Settings::default(),
        backend,
        Arc::new(RecordingLauncher::succeeding()),
        Arc::new(RecordingFrontend::default()),
        MemoryClipboard::default(),
    );

    service.start();
    service.start();
    assert_eq!(hook.install_count(), 1);
    assert!(service.is_running());

    service.stop();
    service.stop();
    assert_eq!(hook.uninstall_count(), 1);
    assert!(!service.is_running());
}

#[test]
fn restart_reinstalls_the_hook() {
    let dir = tempdir().expect("create temp dir");
    let (backend, hook) = MockInputBackend::new();
    let mut service = service_with(
        dir.path(),
        Settings::default(),
        backend,
        Arc::new(RecordingLauncher::succeeding()),
        Arc::new(RecordingFrontend::default()),
        MemoryClipboard::default(),
    );

    service.start();
    service.stop();
    service.start();
    assert_eq!(hook.install_count(), 2);
    assert!(service.is_running());
    service.stop();
}

#[test]
fn chord_opens_menu_at_last_pointer_position() {
    let dir = tempdir().expect("create temp dir");
    let (backend, hook) = MockInputBackend::new();
    let frontend = Arc::new(RecordingFrontend::default());
    let mut settings = Settings::default();
    settings.shortcuts.push(LaunchItem::new("Calc", "calc.exe"));

    let mut service = service_with(
        dir.path(),
        settings,
        backend,
        Arc::new(RecordingLauncher::succeeding()),
        Arc::clone(&frontend),
        MemoryClipboard::default(),
    );
    service.start();

    hook.emit(ServiceEvent::PointerMoved { x: 120.0, y: 240.0 });
    chord_press(&hook);

    assert!(wait_for(|| !frontend.menus().is_empty()));
    let menus = frontend.menus();
    let (position, sections) = &menus[0];
    assert_eq!(*position, (120.0, 240.0));
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].kind, SectionKind::Shortcuts);
    assert_eq!(sections[0].items[0].label, "Calc");

    service.stop();
}

#[test]
fn successful_launch_records_usage_and_persists() {
    let dir = tempdir().expect("create temp dir");
    let (backend, _hook) = MockInputBackend::new();
    let launcher = Arc::new(RecordingLauncher::succeeding());
    let mut service = service_with(
        dir.path(),
        Settings::default(),
        backend,
        Arc::clone(&launcher),
        Arc::new(RecordingFrontend::default()),
        MemoryClipboard::default(),
    );
    service.start();

    let handle = service.handle().expect("running service has a handle");
    assert!(handle.select(launch_row("editor.exe", "Editor", &["--wait"])));

    assert!(wait_for(|| !launcher.launches().is_empty()));
    assert_eq!(
        launcher.launches(),
        [("editor.exe".to_string(), vec!["--wait".to_string()])]
    );

    let usage_path = dir.path().join("usage.json");
    assert!(wait_for(|| usage_path.exists()));
    let store = load_usage(&usage_path.to_string_lossy()).expect("load usage");
    let record = store.get("editor.exe").expect("record for launched item");
    assert_eq!(record.display_name, "Editor");
    assert_eq!(record.launches.len(), 1);

    service.stop();
}

#[test]
fn failed_launch_notifies_frontend_and_records_nothing() {
    let dir = tempdir().expect("create temp dir");
    let (backend, _hook) = MockInputBackend::new();
    let frontend = Arc::new(RecordingFrontend::default());
    let mut service = service_with(
        dir.path(),
        Settings::default(),
        backend,
        Arc::new(RecordingLauncher::failing()),
        Arc::clone(&frontend),
        MemoryClipboard::default(),
    );
    service.start();

    let handle = service.handle().expect("running service has a handle");
    handle.select(launch_row("broken.exe", "Broken", &[]));

    assert!(wait_for(|| !frontend.failures().is_empty()));
    assert_eq!(frontend.failures(), ["Broken"]);

    let usage = service.usage_store();
    assert!(usage.lock().expect("lock usage").records().is_empty());
    assert!(!dir.path().join("usage.json").exists());

    service.stop();
}

#[test]
fn clipboard_selection_writes_device_and_counts_use() {
    let dir = tempdir().expect("create temp dir");
    chord_launcher::clipboard::save_clipboard(
        &dir.path().join("clipboard.json").to_string_lossy(),
        &[ClipEntry {
            text: "hello world".into(),
            count: 0,
            last_used: Some(Utc::now()),
        }],
    )
    .expect("seed clipboard file");

    let (backend, _hook) = MockInputBackend::new();
    let written = Arc::new(Mutex::new(Vec::new()));
    let clipboard = MemoryClipboard {
        text: Arc::new(Mutex::new(None)),
        written: Arc::clone(&written),
    };
    let mut service = service_with(
        dir.path(),
        Settings::default(),
        backend,
        Arc::new(RecordingLauncher::succeeding()),
        Arc::new(RecordingFrontend::default()),
        clipboard,
    );
    service.start();

    let handle = service.handle().expect("running service has a handle");
    handle.select(MenuItem {
        label: "hello world".to_string(),
        icon: None,
        key: "hello world".to_string(),
        args: Vec::new(),
        kind: SectionKind::Clipboard,
        quick_index: None,
        detail: None,
    });

    assert!(wait_for(|| !written
        .lock()
        .map(|w| w.is_empty())
        .unwrap_or(true)));
    assert_eq!(written.lock().expect("lock written")[0], "hello world");

    let clips = service.clips_store();
    assert!(wait_for(|| {
        clips
            .lock()
            .map(|store| store.entries().iter().any(|e| e.count == 1))
            .unwrap_or(false)
    }));

    service.stop();
}

#[test]
fn device_text_is_captured_into_history() {
    let dir = tempdir().expect("create temp dir");
    let (backend, _hook) = MockInputBackend::new();
    let text = Arc::new(Mutex::new(Some("copied elsewhere".to_string())));
    let clipboard = MemoryClipboard {
        text: Arc::clone(&text),
        written: Arc::new(Mutex::new(Vec::new())),
    };
    let mut service = service_with(
        dir.path(),
        Settings::default(),
        backend,
        Arc::new(RecordingLauncher::succeeding()),
        Arc::new(RecordingFrontend::default()),
        clipboard,
    );
    service.start();

    let clips = service.clips_store();
    assert!(wait_for(|| {
        clips
            .lock()
            .map(|store| store.entries().iter().any(|e| e.text == "copied elsewhere"))
            .unwrap_or(false)
    }));

    let clips_path = dir.path().join("clipboard.json");
    assert!(wait_for(|| clips_path.exists()));
    let entries = load_clipboard(&clips_path.to_string_lossy()).expect("load clipboard");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "copied elsewhere");
    assert_eq!(entries[0].count, 0);

    service.stop();
}

#[test]
fn stop_flushes_dirty_stores() {
    let dir = tempdir().expect("create temp dir");
    let (backend, _hook) = MockInputBackend::new();
    let mut service = service_with(
        dir.path(),
        Settings::default(),
        backend,
        Arc::new(RecordingLauncher::succeeding()),
        Arc::new(RecordingFrontend::default()),
        MemoryClipboard::default(),
    );
    service.start();

    service
        .usage_store()
        .lock()
        .expect("lock usage")
        .record_launch("editor.exe", "Editor", Utc::now());
    service.stop();

    let store = load_usage(&dir.path().join("usage.json").to_string_lossy()).expect("load usage");
    assert!(store.get("editor.exe").is_some());
}

#[test]
fn handle_goes_stale_after_stop() {
    let dir = tempdir().expect("create temp dir");
    let (backend, _hook) = MockInputBackend::new();
    let mut service = service_with(
        dir.path(),
        Settings::default(),
        backend,
        Arc::new(RecordingLauncher::succeeding()),
        Arc::new(RecordingFrontend::default()),
        MemoryClipboard::default(),
    );
    service.start();
    let handle = service.handle().expect("running service has a handle");
    service.stop();

    assert!(service.handle().is_none());
    assert!(!handle.select(launch_row("editor.exe", "Editor", &[])));
}
