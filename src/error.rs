use std::io;
use std::fmt::Display;
use std::str::Utf8Error;
use thiserror::Error;
use msgbox::IconType;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

impl ConfigError {
    pub fn is_file_not_found_error(&self) -> bool {
        match self {
            ConfigError::IOError { source } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (iced): {source}")]
    Iced { #[from] source: iced::Error },

    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },
}

/// Failures reported by the wireless peripheral platform.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Error communicating with device (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("No bluetooth adapter is available")]
    NoAdapter,

    #[error("The selected device is no longer known: {0}")]
    UnknownDevice(String),

    #[error("The device does not offer service {0}")]
    MissingService(Uuid),

    #[error("The device does not offer characteristic {0}")]
    MissingCharacteristic(Uuid),
}

/// Reasons a connect attempt ended without a session.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("a session is already active")]
    SessionActive,

    #[error("a connection attempt is already in progress")]
    AttemptInProgress,

    #[error("device selection was cancelled")]
    PromptCancelled,

    #[error("no devices were found")]
    NoDevicesFound,

    #[error("device discovery failed: {source}")]
    Discovery { source: DeviceError },

    #[error("could not establish a link: {source}")]
    Link { source: DeviceError },

    #[error("could not resolve the data channel: {source}")]
    Resolve { source: DeviceError },

    #[error("could not enable notifications: {source}")]
    Subscribe { source: DeviceError },
}

pub fn error_msgbox<T: Display>(message: &'static str, error: &T) {
    let message = format!("{}: {}", message, error);
    log::error!("{}", &message);
    if let Err(err) = msgbox::create(concat!("Vitals Monitor ", env!("CARGO_PKG_VERSION")), &message, IconType::Error) {
        log::error!("Failed to create msgbox: {:?}", err);
    }
}
