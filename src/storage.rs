use std::path::Path;

/// Write `contents` to `path` atomically: the data goes to a sibling
/// temporary file first and is renamed over the target, so a crash
/// mid-write can never leave a torn file behind.
pub(crate) fn write_atomic(path: &str, contents: &str) -> anyhow::Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
