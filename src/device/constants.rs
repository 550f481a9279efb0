/**
 * The UUID of the Bluetooth BLE service that carries the readings.
 * Standard "Battery Service"; replace it through the config file for other sketches.
 */
pub const DEFAULT_SERVICE: &str = "0000180f-0000-1000-8000-00805f9b34fb";

/**
 * The UUID of the Bluetooth BLE remote GATT characteristic that pushes the readings.
 * Standard "Battery Level".
 */
pub const DEFAULT_DATA_CHARACTERISTIC: &str = "00002a19-0000-1000-8000-00805f9b34fb";

/**
 * How long (milliseconds) to scan for peripherals before offering them to the user.
 */
pub const DEFAULT_SCAN_DURATION: u64 = 4000;

pub const DEFAULT_HEART_RATE_LABEL: &str = "Ortalama BPM:";
pub const DEFAULT_OXYGEN_SATURATION_LABEL: &str = "Ortalama SpO2:";
pub const DEFAULT_GLUCOSE_LABEL: &str = "Glukoz:";

/**
 * Shown in a value slot while its value is unknown.
 */
pub const PLACEHOLDER: &str = "--";

/**
 * Capacity of the channels between the GUI and the session loop.
 */
pub const COMMAND_CHANNEL_SIZE: usize = 16;
pub const EVENT_CHANNEL_SIZE: usize = 64;
