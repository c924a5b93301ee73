//! In-memory motion engine, sensor and pin for exercising axis logic with a
//! manual clock.

use std::sync::{Arc, Mutex};

use embedded_hal::digital::OutputPin;
use stepper_engine::SimulatedPin;
use utilities::{
    clock::ManualClock,
    motion::{AnalogInput, MotionEngine},
};

use crate::controller::{
    axis_config::AxisConfig,
    single_axis::{AxisController, AxisTiming},
};

const START_PHYSICAL: i64 = 5000;
const STEPS_PER_POLL: i32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCall {
    SetSpeed(u32),
    SetAcceleration(u32),
    SetCurrentPosition(i32),
    MoveTo(i32),
    Stop,
}

/// Where the fake hall sensor sees the magnet.
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    /// Triggered at or below this physical position.
    At(i64),
    Always,
    Never,
}

#[derive(Debug)]
struct EngineSim {
    position: i32,
    target: i32,
    origin: i64,
    frozen: bool,
    calls: Vec<EngineCall>,
}

impl EngineSim {
    fn physical(&self) -> i64 {
        self.origin + self.position as i64
    }
}

type Shared = Arc<Mutex<EngineSim>>;

/// Walks a fixed number of steps toward its target each time it is polled.
pub struct FakeEngine(Shared);

impl MotionEngine for FakeEngine {
    fn set_speed(&mut self, steps_per_second: u32) {
        self.0.lock().unwrap().calls.push(EngineCall::SetSpeed(steps_per_second));
    }

    fn set_acceleration(&mut self, steps_per_second_squared: u32) {
        self.0
            .lock()
            .unwrap()
            .calls
            .push(EngineCall::SetAcceleration(steps_per_second_squared));
    }

    fn set_current_position(&mut self, steps: i32) {
        let mut sim = self.0.lock().unwrap();
        let physical = sim.physical();
        sim.origin = physical - steps as i64;
        sim.position = steps;
        sim.target = steps;
        sim.calls.push(EngineCall::SetCurrentPosition(steps));
    }

    fn move_to(&mut self, steps: i32) {
        let mut sim = self.0.lock().unwrap();
        sim.target = steps;
        sim.calls.push(EngineCall::MoveTo(steps));
    }

    fn stop(&mut self) {
        let mut sim = self.0.lock().unwrap();
        if !sim.frozen {
            sim.target = sim.position;
        }
        sim.calls.push(EngineCall::Stop);
    }

    fn is_running(&self) -> bool {
        let mut sim = self.0.lock().unwrap();
        if sim.position == sim.target {
            return false;
        }

        if !sim.frozen {
            let remaining = sim.target - sim.position;
            sim.position += remaining.clamp(-STEPS_PER_POLL, STEPS_PER_POLL);
        }
        true
    }

    fn current_position(&self) -> i32 {
        self.0.lock().unwrap().position
    }

    fn pending_target(&self) -> i32 {
        self.0.lock().unwrap().target
    }
}

pub struct FakeSensor {
    sim: Shared,
    trigger: Trigger,
}

impl AnalogInput for FakeSensor {
    fn read(&mut self) -> u16 {
        let physical = self.sim.lock().unwrap().physical();
        let triggered = match self.trigger {
            Trigger::At(at) => physical <= at,
            Trigger::Always => true,
            Trigger::Never => false,
        };

        if triggered { 962 } else { 512 }
    }
}

pub struct Rig {
    sim: Shared,
    trigger: Trigger,
    pub pin: SimulatedPin,
    pub clock: ManualClock,
}

impl Rig {
    fn new(trigger: Trigger) -> Self {
        let sim = EngineSim {
            position: 0,
            target: 0,
            origin: START_PHYSICAL,
            frozen: false,
            calls: Vec::new(),
        };

        Self {
            sim: Arc::new(Mutex::new(sim)),
            trigger,
            pin: SimulatedPin::new("test enable"),
            clock: ManualClock::new(),
        }
    }

    pub fn engine(&self) -> FakeEngine {
        FakeEngine(self.sim.clone())
    }

    pub fn sensor(&self) -> FakeSensor {
        FakeSensor {
            sim: self.sim.clone(),
            trigger: self.trigger,
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.sim.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.sim.lock().unwrap().calls.clear();
    }

    /// Pins the engine mid-move: it reports running and ignores `stop`
    /// until [`Rig::come_to_rest`].
    pub fn hold_in_motion(&self, position: i32, target: i32) {
        let mut sim = self.sim.lock().unwrap();
        sim.position = position;
        sim.target = target;
        sim.frozen = true;
    }

    pub fn come_to_rest(&self) {
        let mut sim = self.sim.lock().unwrap();
        sim.target = sim.position;
        sim.frozen = false;
    }
}

pub type TestAxis<P = SimulatedPin> = AxisController<FakeEngine, FakeSensor, P, ManualClock>;

pub fn test_config() -> AxisConfig {
    AxisConfig::new(1, 65536, 50)
}

fn build<P: OutputPin>(rig: &Rig, pin: P) -> TestAxis<P> {
    AxisController::new(
        test_config(),
        AxisTiming::default(),
        rig.engine(),
        rig.sensor(),
        pin,
        rig.clock.clone(),
    )
    .unwrap()
}

pub fn axis_with_pin<P: OutputPin>(trigger: Trigger, pin: P) -> (TestAxis<P>, Rig) {
    let rig = Rig::new(trigger);
    (build(&rig, pin), rig)
}

pub fn test_axis(trigger: Trigger) -> (TestAxis, Rig) {
    let rig = Rig::new(trigger);
    (build(&rig, rig.pin.clone()), rig)
}

/// Axis homed against a reference at physical 100, parked at center with the
/// call log cleared.
pub fn homed_axis() -> (TestAxis, Rig) {
    let (mut axis, rig) = test_axis(Trigger::At(100));
    axis.enable_motor().unwrap();
    rig.clear_calls();
    (axis, rig)
}
