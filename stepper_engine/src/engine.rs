use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};
use utilities::motion::MotionEngine;

use crate::profile::StepperProfile;

const DEFAULT_SPEED: u32 = 25000;
const DEFAULT_ACCELERATION: u32 = 15000;

struct EngineState {
    profile: StepperProfile,
    /// Physical carriage position when the step counter reads zero.
    origin: i64,
    /// -1 when the direction output is inverted.
    direction: i64,
}

impl EngineState {
    fn physical_position(&self) -> i64 {
        self.origin + self.direction * self.profile.position() as i64
    }
}

fn lock(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read-only view of where the carriage physically is, independent of any
/// rebasing of the step counter.
#[derive(Clone)]
pub struct CarriageProbe {
    state: Arc<Mutex<EngineState>>,
}

impl CarriageProbe {
    pub fn physical_position(&self) -> i64 {
        lock(&self.state).physical_position()
    }
}

/// Step generator for one pulse channel, advanced by a background thread.
pub struct StepperEngine {
    pulse_channel: u8,
    state: Arc<Mutex<EngineState>>,
    alive: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl StepperEngine {
    pub fn new(
        pulse_channel: u8,
        direction_pin: u8,
        reverse_direction: bool,
        initial_physical_position: i64,
        step_interval: Duration,
    ) -> std::io::Result<Self> {
        let state = Arc::new(Mutex::new(EngineState {
            profile: StepperProfile::new(DEFAULT_SPEED, DEFAULT_ACCELERATION),
            origin: initial_physical_position,
            direction: if reverse_direction { -1 } else { 1 },
        }));
        let alive = Arc::new(AtomicBool::new(true));

        let worker = {
            let state = state.clone();
            let alive = alive.clone();
            std::thread::Builder::new()
                .name(format!("stepper-{}", pulse_channel))
                .spawn(move || {
                    let mut last = Instant::now();
                    while alive.load(Ordering::Relaxed) {
                        std::thread::sleep(step_interval);
                        let now = Instant::now();
                        lock(&state).profile.advance(now - last);
                        last = now;
                    }
                })?
        };

        info!(
            "Stepper engine on pulse channel {} (dir pin {}, reversed: {})",
            pulse_channel, direction_pin, reverse_direction
        );

        Ok(Self {
            pulse_channel,
            state,
            alive,
            worker: Some(worker),
        })
    }

    pub fn probe(&self) -> CarriageProbe {
        CarriageProbe {
            state: self.state.clone(),
        }
    }
}

impl MotionEngine for StepperEngine {
    fn set_speed(&mut self, steps_per_second: u32) {
        lock(&self.state).profile.set_max_speed(steps_per_second);
    }

    fn set_acceleration(&mut self, steps_per_second_squared: u32) {
        lock(&self.state)
            .profile
            .set_acceleration(steps_per_second_squared);
    }

    fn set_current_position(&mut self, steps: i32) {
        let mut state = lock(&self.state);
        let physical = state.physical_position();
        state.origin = physical - state.direction * steps as i64;
        state.profile.set_current_position(steps);
    }

    fn move_to(&mut self, steps: i32) {
        debug!("Channel {} move to {}", self.pulse_channel, steps);
        lock(&self.state).profile.move_to(steps);
    }

    fn stop(&mut self) {
        lock(&self.state).profile.stop();
    }

    fn is_running(&self) -> bool {
        lock(&self.state).profile.is_running()
    }

    fn current_position(&self) -> i32 {
        lock(&self.state).profile.position()
    }

    fn pending_target(&self) -> i32 {
        lock(&self.state).profile.target()
    }
}

impl Drop for StepperEngine {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Stepper thread for channel {} panicked", self.pulse_channel);
            }
        }
    }
}
