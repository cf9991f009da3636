use std::path::PathBuf;

use chord_launcher::instance::acquire_instance_guard;
use chord_launcher::logging;
use chord_launcher::service::{LauncherService, StorePaths};
use chord_launcher::settings::{default_data_dir, Settings, SETTINGS_FILE};

fn main() -> anyhow::Result<()> {
    let data_dir = default_data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let settings_path = data_dir.join(SETTINGS_FILE);
    let (settings, settings_err) = match Settings::load(&settings_path.to_string_lossy()) {
        Ok(settings) => (settings, None),
        Err(err) => (Settings::default(), Some(err)),
    };

    logging::init(
        settings.debug_logging,
        settings.log_file.as_ref().map(PathBuf::from),
    );

    // Logging was not up yet when the settings were read.
    if let Some(err) = settings_err {
        tracing::error!(?err, "failed to load settings, using defaults");
    }

    let _guard = match acquire_instance_guard(&data_dir)? {
        Some(guard) => guard,
        None => {
            tracing::warn!("another instance is already running, exiting");
            return Ok(());
        }
    };

    let mut service = LauncherService::new(settings, StorePaths::in_dir(&data_dir));
    service.start();
    tracing::info!("ready, press left and right mouse buttons together for the menu");

    loop {
        std::thread::sleep(std::time::Duration::from_millis(500));
    }
}
