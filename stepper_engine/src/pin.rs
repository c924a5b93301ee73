use std::{
    convert::Infallible,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use embedded_hal::digital::{ErrorType, OutputPin};
use tracing::info;

/// Digital output that records and logs its level instead of driving hardware.
#[derive(Debug, Clone)]
pub struct SimulatedPin {
    name: String,
    high: Arc<AtomicBool>,
}

impl SimulatedPin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            high: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_high(&self) -> bool {
        self.high.load(Ordering::SeqCst)
    }

    fn set(&self, high: bool) {
        if self.high.swap(high, Ordering::SeqCst) != high {
            info!("{} -> {}", self.name, if high { "HIGH" } else { "LOW" });
        }
    }
}

impl ErrorType for SimulatedPin {
    type Error = Infallible;
}

impl OutputPin for SimulatedPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_the_same_level() {
        let mut pin = SimulatedPin::new("enable M1");
        let observer = pin.clone();

        assert!(!observer.is_high());
        pin.set_high().unwrap();
        assert!(observer.is_high());
        pin.set_low().unwrap();
        assert!(!observer.is_high());
    }
}
