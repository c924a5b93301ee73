use serde::{Deserialize, Serialize};

/// Full-scale magnitude of the normalized input.
pub const INPUT_SCALE: f64 = 32768.0;

fn default_center_percent() -> u8 {
    50
}

fn default_max_speed() -> u32 {
    20000
}

fn default_acceleration() -> u32 {
    80000
}

fn default_speed_limit() -> u32 {
    50000
}

fn default_sensor_trigger_level() -> i32 {
    300
}

fn default_sensor_midpoint() -> i32 {
    512
}

/// Motion parameters used only while searching for the reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HomingConfig {
    pub speed: u32,
    pub acceleration: u32,
    /// Short positive move made before the sweep to break stiction.
    pub stiction_offset: i32,
    /// The sweep targets `-sweep_factor * total_range`.
    pub sweep_factor: u32,
    /// Position assigned to the point where the sensor trips.
    pub overtravel_offset: i32,
    pub poll_interval_ms: u64,
    pub sample_interval_ms: u64,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            speed: 4000,
            acceleration: 60000,
            stiction_offset: 2000,
            sweep_factor: 3,
            overtravel_offset: -500,
            poll_interval_ms: 5,
            sample_interval_ms: 1,
        }
    }
}

/// Wiring, travel and tuning of one axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxisConfig {
    pub axis_id: u32,

    pub sensor_pin: u8,
    pub pulse_channel: u8,
    pub direction_pin: u8,
    pub enable_pin: u8,

    /// Physical travel in steps.
    pub total_range: i32,
    #[serde(default)]
    pub reverse_direction: bool,
    /// Where input 0 lands inside the travel, in percent.
    #[serde(default = "default_center_percent")]
    pub center_percent: u8,

    #[serde(default = "default_max_speed")]
    pub max_speed: u32,
    #[serde(default = "default_acceleration")]
    pub acceleration: u32,
    /// Ceiling for the runtime `speed` command.
    #[serde(default = "default_speed_limit")]
    pub speed_limit: u32,

    /// Conditioned sensor level above which the reference counts as found.
    #[serde(default = "default_sensor_trigger_level")]
    pub sensor_trigger_level: i32,
    /// Raw reading with no magnetic field present.
    #[serde(default = "default_sensor_midpoint")]
    pub sensor_midpoint: i32,

    #[serde(default)]
    pub homing: HomingConfig,
}

impl AxisConfig {
    pub fn new(axis_id: u32, total_range: i32, center_percent: u8) -> Self {
        Self {
            axis_id,
            sensor_pin: 0,
            pulse_channel: 0,
            direction_pin: 0,
            enable_pin: 0,
            total_range,
            reverse_direction: false,
            center_percent,
            max_speed: default_max_speed(),
            acceleration: default_acceleration(),
            speed_limit: default_speed_limit(),
            sensor_trigger_level: default_sensor_trigger_level(),
            sensor_midpoint: default_sensor_midpoint(),
            homing: HomingConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let id = self.axis_id;

        if self.total_range <= 0 {
            return Err(format!("M{}: total_range must be positive", id));
        }
        if self.center_percent > 100 {
            return Err(format!("M{}: center_percent must be within 0..=100", id));
        }
        if self.max_speed == 0 || self.acceleration == 0 {
            return Err(format!("M{}: max_speed and acceleration must be positive", id));
        }
        if self.speed_limit < self.max_speed {
            return Err(format!("M{}: speed_limit is below max_speed", id));
        }
        if self.homing.speed == 0 || self.homing.acceleration == 0 {
            return Err(format!("M{}: homing speed and acceleration must be positive", id));
        }
        if self.homing.sweep_factor == 0 {
            return Err(format!("M{}: homing sweep_factor must be at least 1", id));
        }

        Ok(())
    }

    pub fn command_prefix(&self) -> String {
        format!("M{}", self.axis_id)
    }

    pub fn center_position(&self) -> i32 {
        (self.total_range as i64 * self.center_percent as i64 / 100) as i32
    }

    /// Half-span around the center, sized by the longer side.
    pub fn effective_range(&self) -> i32 {
        let wider_side = self.center_percent.max(100 - self.center_percent.min(100));
        (self.total_range as i64 * wider_side as i64 / 100) as i32
    }

    /// Maps a signed input centred on 0 (nominally `-32768..=32767`) onto
    /// `[0, total_range]`. Out-of-range input saturates.
    pub fn map_input(&self, raw: i32) -> i32 {
        let normalized = (raw as f64 / INPUT_SCALE).clamp(-1.0, 1.0);
        let position = (self.center_position() as f64
            + normalized * self.effective_range() as f64)
            .clamp(0.0, self.total_range as f64);

        position as i32
    }

    /// Target of the homing sweep, far enough past the travel to reach the stop.
    pub fn sweep_target(&self) -> i32 {
        let target = -(self.total_range as i64) * self.homing.sweep_factor as i64;
        target.max(i32::MIN as i64) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configs() -> Vec<AxisConfig> {
        [0u8, 30, 50, 65, 100]
            .into_iter()
            .flat_map(|center| {
                [1, 999, 10000, 65536].map(|range| AxisConfig::new(1, range, center))
            })
            .collect()
    }

    #[test]
    fn derived_positions() {
        let config = AxisConfig::new(1, 10000, 30);
        assert_eq!(config.center_position(), 3000);
        assert_eq!(config.effective_range(), 7000);

        let config = AxisConfig::new(1, 10000, 80);
        assert_eq!(config.center_position(), 8000);
        assert_eq!(config.effective_range(), 8000);

        for config in configs() {
            assert!((0..=config.total_range).contains(&config.center_position()));
            assert!(config.effective_range() <= config.total_range);
        }
    }

    #[test]
    fn mapped_positions_stay_within_travel() {
        for config in configs() {
            for raw in -32768..=32767 {
                let position = config.map_input(raw);
                assert!(
                    (0..=config.total_range).contains(&position),
                    "{} mapped to {} outside 0..={}",
                    raw,
                    position,
                    config.total_range
                );
            }
        }
    }

    #[test]
    fn zero_maps_to_center() {
        for config in configs() {
            assert_eq!(config.map_input(0), config.center_position());
        }
    }

    #[test]
    fn mapping_is_monotonic() {
        for config in configs() {
            let mut previous = config.map_input(-32768);
            for raw in -32767..=32767 {
                let position = config.map_input(raw);
                assert!(position >= previous, "not monotonic at {}", raw);
                previous = position;
            }
        }
    }

    #[test]
    fn out_of_range_input_saturates() {
        let config = AxisConfig::new(1, 10000, 50);
        assert_eq!(config.map_input(i32::MIN), 0);
        assert_eq!(config.map_input(-32768), 0);
        assert_eq!(config.map_input(i32::MAX), 10000);
        assert_eq!(config.map_input(32768), 10000);
        assert_eq!(config.map_input(32767), 9999);
    }

    #[test]
    fn validation_rejects_bad_geometry() {
        assert!(AxisConfig::new(1, 0, 50).validate().is_err());
        assert!(AxisConfig::new(1, -5, 50).validate().is_err());
        assert!(AxisConfig::new(1, 100, 101).validate().is_err());

        let mut config = AxisConfig::new(1, 100, 50);
        config.homing.sweep_factor = 0;
        assert!(config.validate().is_err());

        assert!(AxisConfig::new(1, 100, 50).validate().is_ok());
    }

    #[test]
    fn sweep_target_overshoots_travel() {
        let config = AxisConfig::new(1, 20000, 50);
        assert_eq!(config.sweep_target(), -60000);

        let config = AxisConfig::new(1, i32::MAX, 50);
        assert_eq!(config.sweep_target(), i32::MIN);
    }
}
