use std::time::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::constants::{
    DEFAULT_DATA_CHARACTERISTIC, DEFAULT_GLUCOSE_LABEL, DEFAULT_HEART_RATE_LABEL,
    DEFAULT_OXYGEN_SATURATION_LABEL, DEFAULT_SCAN_DURATION, DEFAULT_SERVICE,
};
use crate::device::types::Field;

/// Which service/characteristic pair carries the readings, and how long to scan for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceConfig {
    pub service_uuid: Uuid,
    pub data_characteristic_uuid: Uuid,
    pub scan_duration_ms: u64,
}

impl DeviceConfig {
    pub fn scan_duration(&self) -> Duration {
        Duration::from_millis(self.scan_duration_ms)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            service_uuid: Uuid::parse_str(DEFAULT_SERVICE).unwrap_or_default(),
            data_characteristic_uuid: Uuid::parse_str(DEFAULT_DATA_CHARACTERISTIC).unwrap_or_default(),
            scan_duration_ms: DEFAULT_SCAN_DURATION,
        }
    }
}

/// The label text the peripheral prefixes each reading with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelConfig {
    pub heart_rate: String,
    pub oxygen_saturation: String,
    pub glucose: String,
}

impl LabelConfig {
    pub fn label(&self, field: Field) -> &str {
        match field {
            Field::HeartRate => &self.heart_rate,
            Field::OxygenSaturation => &self.oxygen_saturation,
            Field::Glucose => &self.glucose,
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        LabelConfig {
            heart_rate: DEFAULT_HEART_RATE_LABEL.to_string(),
            oxygen_saturation: DEFAULT_OXYGEN_SATURATION_LABEL.to_string(),
            glucose: DEFAULT_GLUCOSE_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub device: DeviceConfig,
    pub labels: LabelConfig,
}
