use std::fmt;

use crate::communication::commands::CommandError;

/// Why homing gave up. Both variants are terminal until the device restarts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalibrationFault {
    #[error(
        "Calibration ERROR, hall sensor is already sensing the lever (level {level}), please check hardware and reboot device."
    )]
    SensorAlreadyTriggered { level: i32 },

    #[error("Calibration ERROR, lever not found, please check hardware and reboot device.")]
    ReferenceNotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisStatus {
    Disabled,
    Calibrating,
    Enabled,
    Faulted(CalibrationFault),
}

impl AxisStatus {
    pub fn is_faulted(&self) -> bool {
        matches!(self, AxisStatus::Faulted(_))
    }
}

impl fmt::Display for AxisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisStatus::Disabled => write!(f, "Disabled"),
            AxisStatus::Calibrating => write!(f, "Calibrating"),
            AxisStatus::Enabled => write!(f, "Enabled"),
            AxisStatus::Faulted(_) => write!(f, "Faulted"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AxisError {
    #[error("{0}")]
    Calibration(CalibrationFault),

    #[error("Axis is faulted, command ignored: {0}")]
    Faulted(CalibrationFault),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Failed to drive enable pin: {0}")]
    EnablePin(String),

    #[error("Invalid axis configuration: {0}")]
    InvalidConfig(String),
}
