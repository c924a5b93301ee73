//! Software stand-ins for the actuator hardware: a trapezoidal step generator
//! running on its own thread, a hall sensor that sees the carriage's physical
//! position, and logged digital outputs.

pub mod engine;
pub mod pin;
pub mod profile;
pub mod sensor;

pub use engine::{CarriageProbe, StepperEngine};
pub use pin::SimulatedPin;
pub use profile::StepperProfile;
pub use sensor::SimulatedHallSensor;
