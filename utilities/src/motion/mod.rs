/// Step-pulse generator for one output channel.
///
/// Moves are asynchronous: `move_to` and `stop` only request motion, and the
/// engine turns outstanding targets into pulses on its own. Completion is
/// observed by polling [`MotionEngine::is_running`].
pub trait MotionEngine {
    /// Maximum speed in steps per second.
    fn set_speed(&mut self, steps_per_second: u32);
    /// Acceleration and deceleration in steps per second squared.
    fn set_acceleration(&mut self, steps_per_second_squared: u32);
    /// Rebases the position counter without moving.
    fn set_current_position(&mut self, steps: i32);
    fn move_to(&mut self, steps: i32);
    /// Requests a decelerated stop.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
    fn current_position(&self) -> i32;
    /// Target of the move currently in flight, or of the last one issued.
    fn pending_target(&self) -> i32;
}

/// Raw analog channel, e.g. a 10-bit ADC pin. Readings carry noise.
pub trait AnalogInput {
    fn read(&mut self) -> u16;
}
