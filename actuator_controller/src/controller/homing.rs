use std::time::Duration;

use tracing::{debug, info};
use utilities::{
    clock::Clock,
    motion::{AnalogInput, MotionEngine},
};

use crate::{
    controller::{axis_config::AxisConfig, hall_sensor::HallSensor},
    models::CalibrationFault,
};

/// One homing run: establishes the absolute frame from the hall reference
/// and parks the axis at its center. Blocks until done.
pub struct Homing<'a, E, S, C> {
    config: &'a AxisConfig,
    engine: &'a mut E,
    sensor: &'a mut HallSensor<S>,
    clock: &'a C,
}

impl<'a, E, S, C> Homing<'a, E, S, C>
where
    E: MotionEngine,
    S: AnalogInput,
    C: Clock,
{
    pub fn new(
        config: &'a AxisConfig,
        engine: &'a mut E,
        sensor: &'a mut HallSensor<S>,
        clock: &'a C,
    ) -> Self {
        Self {
            config,
            engine,
            sensor,
            clock,
        }
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.homing.poll_interval_ms)
    }

    fn wait_for_stop(&mut self) {
        let interval = self.poll_interval();
        self.clock.sleep(interval);
        while self.engine.is_running() {
            self.clock.sleep(interval);
        }
    }

    pub fn run(mut self) -> Result<(), CalibrationFault> {
        let config = self.config;
        let homing = &config.homing;
        let prefix = config.command_prefix();
        let trigger_level = config.sensor_trigger_level;
        let sample_interval = Duration::from_millis(homing.sample_interval_ms);

        info!("{} starting calibration", prefix);

        self.engine.set_speed(homing.speed);
        self.engine.set_acceleration(homing.acceleration);
        self.engine.set_current_position(0);

        self.engine.move_to(homing.stiction_offset);
        self.wait_for_stop();

        let baseline = self.sensor.level();
        debug!("{} sensor baseline {}", prefix, baseline);
        if baseline > trigger_level {
            return Err(CalibrationFault::SensorAlreadyTriggered { level: baseline });
        }

        self.engine.move_to(config.sweep_target());

        while self.engine.is_running() {
            let level = self.sensor.level();

            if level > trigger_level {
                info!("{} reference found (level {})", prefix, level);

                self.engine.stop();
                self.wait_for_stop();
                self.engine.set_current_position(homing.overtravel_offset);
                self.engine.move_to(config.center_position());
                self.wait_for_stop();

                return Ok(());
            }

            self.clock.sleep(sample_interval);
        }

        Err(CalibrationFault::ReferenceNotFound)
    }
}
