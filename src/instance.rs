use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::System;

pub const LOCK_FILE: &str = "chord_launcher.lock";

/// Holds the single-instance lock for the lifetime of the process. The
/// lock file is removed again on drop.
pub struct InstanceGuard {
    path: PathBuf,
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("failed to remove instance lock: {e}");
        }
    }
}

/// Take the single-instance lock under `dir`. Returns `None` when another
/// live process already holds it. A lock left behind by a dead process is
/// replaced, so a crash never wedges the next start.
pub fn acquire_instance_guard(dir: &Path) -> anyhow::Result<Option<InstanceGuard>> {
    fs::create_dir_all(dir)?;
    let path = dir.join(LOCK_FILE);

    if let Ok(content) = fs::read_to_string(&path) {
        if let Ok(pid) = content.trim().parse::<u32>() {
            if pid != std::process::id() && process_alive(pid) {
                return Ok(None);
            }
        }
    }

    fs::write(&path, std::process::id().to_string())?;
    Ok(Some(InstanceGuard { path }))
}

fn process_alive(pid: u32) -> bool {
    let system = System::new_all();
    system.process(sysinfo::Pid::from_u32(pid)).is_some()
}
