use crate::models::AxisError;

pub mod axis_config;
pub mod hall_sensor;
pub mod homing;
pub mod multi_axis;
pub mod single_axis;

#[cfg(test)]
pub mod test_support;

/// One independently homed axis, as seen by the router.
pub trait Axis: Send {
    fn axis_id(&self) -> u32;

    fn begin(&mut self, home: bool) -> Result<(), AxisError>;

    /// `command` is the line with the `M<id>` prefix already stripped.
    fn process_command(&mut self, command: &str) -> Result<Option<String>, AxisError>;

    fn tick(&mut self) -> Option<String>;

    fn disable_motor(&mut self) -> Result<(), AxisError>;
}
