use serde::{Deserialize, Serialize};

/// Bench stand-in for one axis' hardware.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Physical carriage position at power-up. Defaults to the axis center.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_position: Option<i64>,
    /// Physical position of the homing magnet.
    pub magnet_position: i64,
    /// Distance over which the magnet's field is felt.
    pub magnet_width: u32,
    /// Amplitude of uniform noise added to sensor readings.
    pub noise: u16,
    /// Period of the step generator thread.
    pub step_interval_us: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_position: None,
            magnet_position: -300,
            magnet_width: 600,
            noise: 4,
            step_interval_us: 500,
        }
    }
}
