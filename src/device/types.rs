use std::fmt;
use futures::channel::mpsc::Sender;

use crate::device::display::DisplayState;

/// The three readings the peripheral reports, in label matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    HeartRate,
    OxygenSaturation,
    Glucose,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::HeartRate, Field::OxygenSaturation, Field::Glucose];

    pub fn title(&self) -> &'static str {
        match self {
            Field::HeartRate => "Heart rate (BPM)",
            Field::OxygenSaturation => "SpO2 (%)",
            Field::Glucose => "Glucose (mg/dL)",
        }
    }
}

/// A value extracted from one notification, stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub field: Field,
    pub value: String,
}

/// Opaque platform identifier of a discovered peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(pub String);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub id: DeviceId,
    pub name: Option<String>,
    pub address: String,
    pub rssi: Option<i16>,
}

impl fmt::Display for DiscoveredDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name.as_deref().unwrap_or("Unnamed device"), self.address)?;
        if let Some(rssi) = self.rssi {
            write!(f, " {} dBm", rssi)?;
        }
        Ok(())
    }
}

/// Requests from the GUI to the session loop.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Discover,
    Connect(DeviceId),
    CancelPrompt,
    Disconnect,
}

/// Updates from the session loop to the GUI.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Ready(Sender<SessionCommand>),
    Display(DisplayState),
    Discovered(Vec<DiscoveredDevice>),
    Failed(String),
    Closed,
}
