/// Hands a selected item to the operating system.
///
/// Implementations must not block on the launched program; a successful
/// return means the handoff happened, not that the program ran.
pub trait LaunchTarget: Send + Sync {
    fn launch(&self, path: &str, args: &[String]) -> anyhow::Result<()>;
}

/// Launches via `std::process::Command` when arguments are involved and
/// falls back to the platform opener for plain files, folders and URLs.
pub struct SystemLauncher;

impl LaunchTarget for SystemLauncher {
    fn launch(&self, path: &str, args: &[String]) -> anyhow::Result<()> {
        if !args.is_empty() {
            let mut command = std::process::Command::new(path);
            command.args(args);
            return command.spawn().map(|_| ()).map_err(|e| e.into());
        }

        // A bare path that splits into several words is a command line,
        // e.g. "wt.exe -p Ubuntu".
        if let Some(words) = shlex::split(path) {
            if words.len() > 1 {
                let mut command = std::process::Command::new(&words[0]);
                command.args(&words[1..]);
                return command.spawn().map(|_| ()).map_err(|e| e.into());
            }
        }

        open::that(path).map_err(|e| e.into())
    }
}

/// Access to the system clipboard. Reads are polled, so a failed read is
/// an ordinary `None` rather than an error.
pub trait ClipboardDevice: Send {
    fn read_text(&mut self) -> Option<String>;
    fn write_text(&mut self, text: &str) -> anyhow::Result<()>;
}

/// [`arboard`] backed clipboard. When the platform clipboard cannot be
/// opened at all the device degrades to a no-op so the rest of the
/// program keeps running without history capture.
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        let inner = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                tracing::warn!("failed to init clipboard, capture disabled: {e}");
                None
            }
        };
        Self { inner }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardDevice for SystemClipboard {
    fn read_text(&mut self) -> Option<String> {
        self.inner.as_mut()?.get_text().ok()
    }

    fn write_text(&mut self, text: &str) -> anyhow::Result<()> {
        match self.inner.as_mut() {
            Some(clipboard) => {
                clipboard.set_text(text.to_string())?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}
