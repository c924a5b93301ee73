pub mod clock;
pub mod command_executor;
pub mod motion;
pub mod moving_average;
