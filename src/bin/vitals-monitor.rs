use log::info;
use msgbox::IconType;
use vitals_monitor::{init_logging, run};
use vitals_monitor::error::{error_msgbox, AppRunError, ConfigError};

// Embedded so that macOS grants Bluetooth access when the binary is launched directly,
// without an app bundle.
#[cfg(target_os = "macos")]
embed_plist::embed_info_plist!(concat!(env!("OUT_DIR"), "/Info.plist"));

fn main() -> Result<(), AppRunError> {
    init_logging();
    info!(concat!("Vitals Monitor ", env!("CARGO_PKG_VERSION")));

    match run() {
        Err(AppRunError::ConfigError { source: ConfigError::CanNotLock { .. } }) => {
            if let Err(err) = msgbox::create(
                concat!("Vitals Monitor ", env!("CARGO_PKG_VERSION")),
                "This application has already been started",
                IconType::Error,
            ) {
                log::error!("Failed to create msgbox: {:?}", err);
            }
            Ok(())
        },
        Err(err) => {
            error_msgbox("Unexpected error", &err);
            Err(err)
        },
        Ok(_) => Ok(()),
    }
}
