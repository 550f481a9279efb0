use crate::device::constants::PLACEHOLDER;
use crate::device::types::{Field, Reading};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting…",
            ConnectionStatus::Connected => "Connected",
        }
    }

    /// RGB colour of the status label.
    pub fn color(&self) -> [u8; 3] {
        match self {
            ConnectionStatus::Disconnected => [0x66, 0x66, 0x66],
            ConnectionStatus::Connecting => [0xFF, 0x98, 0x00],
            ConnectionStatus::Connected => [0x4C, 0xAF, 0x50],
        }
    }

    /// Text of the connect/disconnect toggle.
    pub fn toggle_label(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Connect to device",
            ConnectionStatus::Connecting => "Connecting…",
            ConnectionStatus::Connected => "Disconnect",
        }
    }
}

/// Last known value of every field plus the connection status, as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    pub status: ConnectionStatus,
    heart_rate: Option<String>,
    oxygen_saturation: Option<String>,
    glucose: Option<String>,
}

impl DisplayState {
    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::HeartRate => &mut self.heart_rate,
            Field::OxygenSaturation => &mut self.oxygen_saturation,
            Field::Glucose => &mut self.glucose,
        }
    }

    /// `None` while the value is unknown.
    pub fn value(&self, field: Field) -> Option<&str> {
        let slot = match field {
            Field::HeartRate => &self.heart_rate,
            Field::OxygenSaturation => &self.oxygen_saturation,
            Field::Glucose => &self.glucose,
        };
        slot.as_deref()
    }

    pub fn value_text(&self, field: Field) -> &str {
        self.value(field).unwrap_or(PLACEHOLDER)
    }

    pub fn apply(&mut self, reading: Reading) {
        *self.slot_mut(reading.field) = Some(reading.value);
    }

    /// Forgets every value and shows the disconnected status.
    pub fn reset(&mut self) {
        *self = DisplayState::default();
    }
}
