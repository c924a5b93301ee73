use std::time::Duration;

use embedded_hal::digital::OutputPin;
use tracing::{error, info, warn};
use utilities::{
    clock::Clock,
    motion::{AnalogInput, MotionEngine},
};

use crate::{
    communication::commands::AxisCommand,
    controller::{Axis, axis_config::AxisConfig, hall_sensor::HallSensor, homing::Homing},
    models::{AxisError, AxisStatus, CalibrationFault},
};

/// Timers shared by every axis.
#[derive(Debug, Clone, Copy)]
pub struct AxisTiming {
    /// Motor is disabled after this long without an accepted command.
    pub idle_timeout: Duration,
    /// How often a faulted axis repeats its diagnostic.
    pub fault_report_interval: Duration,
}

impl Default for AxisTiming {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            fault_report_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct AxisState {
    status: AxisStatus,
    target_position: Option<i32>,
    queued_position: Option<i32>,
    last_change: Duration,
    last_fault_report: Duration,
    max_speed: u32,
}

/// Closed-loop-free controller for one hall-homed stepper axis.
pub struct AxisController<E, S, P, C> {
    config: AxisConfig,
    timing: AxisTiming,

    engine: E,
    sensor: HallSensor<S>,
    enable_pin: P,
    clock: C,

    state: AxisState,
}

impl<E, S, P, C> AxisController<E, S, P, C>
where
    E: MotionEngine,
    S: AnalogInput,
    P: OutputPin,
    C: Clock,
{
    pub fn new(
        config: AxisConfig,
        timing: AxisTiming,
        engine: E,
        sensor: S,
        enable_pin: P,
        clock: C,
    ) -> Result<Self, AxisError> {
        config.validate().map_err(AxisError::InvalidConfig)?;

        let state = AxisState {
            status: AxisStatus::Disabled,
            target_position: None,
            queued_position: None,
            last_change: clock.now(),
            last_fault_report: Duration::ZERO,
            max_speed: config.max_speed,
        };

        Ok(Self {
            sensor: HallSensor::new(sensor, config.sensor_midpoint),
            config,
            timing,
            engine,
            enable_pin,
            clock,
            state,
        })
    }

    pub fn axis_id(&self) -> u32 {
        self.config.axis_id
    }

    pub fn status(&self) -> &AxisStatus {
        &self.state.status
    }

    pub fn is_motor_enabled(&self) -> bool {
        matches!(
            self.state.status,
            AxisStatus::Enabled | AxisStatus::Calibrating
        )
    }

    pub fn target_position(&self) -> Option<i32> {
        self.state.target_position
    }

    pub fn queued_position(&self) -> Option<i32> {
        self.state.queued_position
    }

    pub fn max_speed(&self) -> u32 {
        self.state.max_speed
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn prefix(&self) -> String {
        self.config.command_prefix()
    }

    fn set_enable_output(&mut self, enabled: bool) -> Result<(), AxisError> {
        let result = if enabled {
            self.enable_pin.set_high()
        } else {
            self.enable_pin.set_low()
        };

        result.map_err(|e| AxisError::EnablePin(format!("{:?}", e)))
    }

    fn apply_motion_params(&mut self) {
        self.engine.set_speed(self.state.max_speed);
        self.engine.set_acceleration(self.config.acceleration);
    }

    /// Applies operating speeds and, if asked, homes right away.
    pub fn begin(&mut self, home: bool) -> Result<(), AxisError> {
        self.apply_motion_params();

        if home {
            self.enable_motor()?;
        }

        Ok(())
    }

    /// Energizes the motor. Coming from `Disabled` this always re-homes.
    pub fn enable_motor(&mut self) -> Result<(), AxisError> {
        match &self.state.status {
            AxisStatus::Faulted(fault) => return Err(AxisError::Faulted(fault.clone())),
            AxisStatus::Enabled | AxisStatus::Calibrating => return Ok(()),
            AxisStatus::Disabled => {}
        }

        info!("{} enabling motor", self.prefix());
        self.set_enable_output(true)?;

        self.state.status = AxisStatus::Calibrating;
        self.state.target_position = None;
        self.state.queued_position = None;

        let result = Homing::new(
            &self.config,
            &mut self.engine,
            &mut self.sensor,
            &self.clock,
        )
        .run();

        match result {
            Ok(()) => {
                self.apply_motion_params();
                self.state.status = AxisStatus::Enabled;
                self.state.last_change = self.clock.now();
                info!("{} calibration successful", self.prefix());
                Ok(())
            }
            Err(fault) => {
                self.enter_fault(fault.clone());
                Err(AxisError::Calibration(fault))
            }
        }
    }

    pub fn disable_motor(&mut self) -> Result<(), AxisError> {
        if self.state.status != AxisStatus::Enabled {
            return Ok(());
        }

        info!("{} disabling motor", self.prefix());

        self.state.status = AxisStatus::Disabled;
        self.state.target_position = None;
        self.state.queued_position = None;

        if self.engine.is_running() {
            self.engine.stop();
        }

        self.set_enable_output(false)
    }

    fn enter_fault(&mut self, fault: CalibrationFault) {
        error!("{} {}", self.prefix(), fault);

        self.state.status = AxisStatus::Faulted(fault);
        self.state.target_position = None;
        self.state.queued_position = None;
        self.state.last_fault_report = self.clock.now();

        if let Err(e) = self.set_enable_output(false) {
            error!("{} {}", self.prefix(), e);
        }
    }

    /// Handles the text that followed this axis' prefix on a command line.
    /// Returns a reply line for queries.
    pub fn process_command(&mut self, command: &str) -> Result<Option<String>, AxisError> {
        let command = command.parse::<AxisCommand>()?;
        self.execute(command)
    }

    pub fn execute(&mut self, command: AxisCommand) -> Result<Option<String>, AxisError> {
        if let AxisCommand::Status = command {
            return Ok(Some(self.status_line()));
        }

        if let AxisStatus::Faulted(fault) = &self.state.status {
            return Err(AxisError::Faulted(fault.clone()));
        }

        match command {
            AxisCommand::MoveTo(raw) => self.move_to_input(raw)?,
            AxisCommand::SetSpeed(speed) => self.set_max_speed(speed),
            AxisCommand::Status => {}
        }

        Ok(None)
    }

    pub fn set_max_speed(&mut self, speed: u32) {
        let speed = if speed > self.config.speed_limit {
            warn!(
                "{} speed {} above limit, clamped to {}",
                self.prefix(),
                speed,
                self.config.speed_limit
            );
            self.config.speed_limit
        } else {
            speed
        };

        self.state.max_speed = speed;
        info!("{} speed set to {}", self.prefix(), speed);
        self.apply_motion_params();
    }

    /// Maps `raw` onto the travel and decides how to get there from whatever
    /// the engine is doing now.
    pub fn move_to_input(&mut self, raw: i32) -> Result<(), AxisError> {
        if let AxisStatus::Faulted(fault) = &self.state.status {
            return Err(AxisError::Faulted(fault.clone()));
        }

        let new_position = self.config.map_input(raw);
        self.state.last_change = self.clock.now();

        if self.state.target_position == Some(new_position) {
            return Ok(());
        }

        self.enable_motor()?;

        self.state.queued_position = None;
        self.state.target_position = Some(new_position);

        if !self.engine.is_running() {
            self.engine.move_to(new_position);
            return Ok(());
        }

        let current = self.engine.current_position();
        let in_flight = self.engine.pending_target();

        let still_ahead_forward = current < in_flight && current < new_position;
        let still_ahead_backward = current > in_flight && current > new_position;

        if still_ahead_forward || still_ahead_backward {
            self.engine.move_to(new_position);
        } else {
            // Reversal: let the engine brake, issue the move once it is at rest.
            self.engine.stop();
            self.state.queued_position = Some(new_position);
        }

        Ok(())
    }

    /// Periodic service. Returns a diagnostic line when a faulted axis is due
    /// to repeat its report.
    pub fn tick(&mut self) -> Option<String> {
        let now = self.clock.now();

        if let AxisStatus::Faulted(fault) = &self.state.status {
            if now.saturating_sub(self.state.last_fault_report) >= self.timing.fault_report_interval
            {
                let line = format!("{} {}", self.prefix(), fault);
                self.state.last_fault_report = now;
                error!("{}", line);
                return Some(line);
            }
            return None;
        }

        if let Some(queued) = self.state.queued_position {
            if !self.engine.is_running() {
                self.engine.move_to(queued);
                self.state.queued_position = None;
            }
        }

        if self.state.status == AxisStatus::Enabled
            && now.saturating_sub(self.state.last_change) >= self.timing.idle_timeout
        {
            info!("{} idle timeout", self.prefix());
            if let Err(e) = self.disable_motor() {
                error!("{} {}", self.prefix(), e);
            }
        }

        None
    }

    pub fn status_line(&self) -> String {
        fn or_dash(value: Option<i32>) -> String {
            value.map_or_else(|| "-".to_string(), |v| v.to_string())
        }

        format!(
            "{} state={} position={} target={} queued={} speed={}",
            self.prefix(),
            self.state.status,
            self.engine.current_position(),
            or_dash(self.state.target_position),
            or_dash(self.state.queued_position),
            self.state.max_speed
        )
    }
}

impl<E, S, P, C> Axis for AxisController<E, S, P, C>
where
    E: MotionEngine + Send,
    S: AnalogInput + Send,
    P: OutputPin + Send,
    C: Clock + Send,
{
    fn axis_id(&self) -> u32 {
        self.config.axis_id
    }

    fn begin(&mut self, home: bool) -> Result<(), AxisError> {
        AxisController::begin(self, home)
    }

    fn process_command(&mut self, command: &str) -> Result<Option<String>, AxisError> {
        AxisController::process_command(self, command)
    }

    fn tick(&mut self) -> Option<String> {
        AxisController::tick(self)
    }

    fn disable_motor(&mut self) -> Result<(), AxisError> {
        AxisController::disable_motor(self)
    }
}
