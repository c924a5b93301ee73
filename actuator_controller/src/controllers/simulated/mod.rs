pub mod config;

use std::time::Duration;

use anyhow::Context as _;
use stepper_engine::{SimulatedHallSensor, SimulatedPin, StepperEngine};
use tracing::info;
use utilities::clock::SystemClock;

use crate::{
    config::{AxisEntry, ControllerConfig},
    controller::{
        Axis,
        single_axis::{AxisController, AxisTiming},
    },
};

pub type SimulatedAxis =
    AxisController<StepperEngine, SimulatedHallSensor, SimulatedPin, SystemClock>;

pub fn create_axis(entry: &AxisEntry, timing: AxisTiming) -> anyhow::Result<SimulatedAxis> {
    let axis = &entry.axis;
    let simulation = &entry.simulation;

    let initial_position = simulation
        .initial_position
        .unwrap_or(axis.center_position() as i64);

    let engine = StepperEngine::new(
        axis.pulse_channel,
        axis.direction_pin,
        axis.reverse_direction,
        initial_position,
        Duration::from_micros(simulation.step_interval_us),
    )
    .with_context(|| format!("Failed to start step generator for M{}", axis.axis_id))?;

    let sensor = SimulatedHallSensor::new(
        engine.probe(),
        simulation.magnet_position,
        simulation.magnet_width,
    )
    .with_midpoint(axis.sensor_midpoint.clamp(0, u16::MAX as i32) as u16)
    .with_noise(simulation.noise);

    let enable_pin = SimulatedPin::new(format!("M{} enable (pin {})", axis.axis_id, axis.enable_pin));

    info!(
        "M{}: simulated axis, sensor pin {}, carriage at {}, magnet at {}",
        axis.axis_id, axis.sensor_pin, initial_position, simulation.magnet_position
    );

    let controller = AxisController::new(
        axis.clone(),
        timing,
        engine,
        sensor,
        enable_pin,
        SystemClock::new(),
    )?;

    Ok(controller)
}

pub fn create_axes(config: &ControllerConfig) -> anyhow::Result<Vec<Box<dyn Axis>>> {
    let timing = config.control.axis_timing();

    config
        .axes
        .iter()
        .map(|entry| create_axis(entry, timing).map(|axis| Box::new(axis) as Box<dyn Axis>))
        .collect()
}
