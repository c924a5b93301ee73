use std::time::Duration;

/// Trapezoidal velocity profile over an integer step counter.
///
/// Velocity is signed, in steps per second. The profile accelerates toward the
/// target, brakes when the remaining distance falls inside the braking
/// distance, and snaps onto the target on arrival.
#[derive(Debug, Clone)]
pub struct StepperProfile {
    position: f64,
    target: i32,
    velocity: f64,
    max_speed: f64,
    acceleration: f64,
}

impl StepperProfile {
    pub fn new(max_speed: u32, acceleration: u32) -> Self {
        Self {
            position: 0.0,
            target: 0,
            velocity: 0.0,
            max_speed: max_speed.max(1) as f64,
            acceleration: acceleration.max(1) as f64,
        }
    }

    pub fn position(&self) -> i32 {
        self.position.round() as i32
    }

    pub fn target(&self) -> i32 {
        self.target
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn set_max_speed(&mut self, steps_per_second: u32) {
        self.max_speed = steps_per_second.max(1) as f64;
    }

    pub fn set_acceleration(&mut self, steps_per_second_squared: u32) {
        self.acceleration = steps_per_second_squared.max(1) as f64;
    }

    /// Shifts the reference frame; a move in flight keeps its physical goal.
    pub fn set_current_position(&mut self, steps: i32) {
        let delta = steps as f64 - self.position;
        self.position = steps as f64;
        self.target = (self.target as f64 + delta).round() as i32;
    }

    pub fn move_to(&mut self, steps: i32) {
        self.target = steps;
    }

    /// Retargets to the nearest point reachable with the current deceleration.
    pub fn stop(&mut self) {
        if self.velocity == 0.0 {
            self.target = self.position();
            return;
        }

        let braking = self.braking_distance().ceil();
        self.target = (self.position + self.velocity.signum() * braking).round() as i32;
    }

    pub fn is_running(&self) -> bool {
        self.velocity != 0.0 || self.position() != self.target
    }

    fn braking_distance(&self) -> f64 {
        self.velocity * self.velocity / (2.0 * self.acceleration)
    }

    /// Integrates the profile over `dt`.
    pub fn advance(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        if dt <= 0.0 {
            return;
        }

        let remaining = self.target as f64 - self.position;
        if self.velocity == 0.0 && remaining.abs() < 0.5 {
            self.position = self.target as f64;
            return;
        }

        let direction = remaining.signum();
        let speed = self.velocity.abs();
        let heading_to_target = self.velocity == 0.0 || self.velocity.signum() == direction;

        let must_brake = !heading_to_target || remaining.abs() <= self.braking_distance();
        let new_speed = if must_brake {
            (speed - self.acceleration * dt).max(0.0)
        } else {
            (speed + self.acceleration * dt).min(self.max_speed)
        };

        let mut new_velocity = if heading_to_target {
            direction * new_speed
        } else {
            self.velocity.signum() * new_speed
        };

        // Braking can bleed off all speed a fraction of a step short of the target.
        if heading_to_target && new_velocity == 0.0 {
            new_velocity = direction * (self.acceleration * dt).min(self.max_speed);
        }

        let travel = new_velocity * dt;
        if heading_to_target && travel.abs() >= remaining.abs() {
            self.position = self.target as f64;
            self.velocity = 0.0;
        } else {
            self.position += travel;
            self.velocity = new_velocity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(1);

    fn run_until_idle(profile: &mut StepperProfile, max_ticks: usize) -> usize {
        for tick in 0..max_ticks {
            if !profile.is_running() {
                return tick;
            }
            profile.advance(TICK);
        }
        panic!("profile still running after {} ticks", max_ticks);
    }

    #[test]
    fn reaches_target_without_overshoot() {
        let mut profile = StepperProfile::new(4000, 60000);
        profile.move_to(2000);

        let mut furthest = 0;
        for _ in 0..5000 {
            profile.advance(TICK);
            furthest = furthest.max(profile.position());
            if !profile.is_running() {
                break;
            }
        }

        assert_eq!(profile.position(), 2000);
        assert_eq!(furthest, 2000);
        assert_eq!(profile.velocity(), 0.0);
    }

    #[test]
    fn respects_speed_limit() {
        let mut profile = StepperProfile::new(1000, 100000);
        profile.move_to(-5000);

        for _ in 0..500 {
            profile.advance(TICK);
            assert!(profile.velocity().abs() <= 1000.0);
        }
        assert!(profile.position() < 0);
    }

    #[test]
    fn stop_brakes_within_braking_distance() {
        let mut profile = StepperProfile::new(4000, 20000);
        profile.move_to(100000);
        for _ in 0..300 {
            profile.advance(TICK);
        }

        let position = profile.position();
        let velocity = profile.velocity();
        profile.stop();
        assert!(profile.is_running());

        run_until_idle(&mut profile, 10000);

        let braking = (velocity * velocity / 40000.0).ceil() as i32;
        assert!(profile.position() >= position);
        assert!(profile.position() <= position + braking + 1);
    }

    #[test]
    fn reversal_decelerates_before_turning() {
        let mut profile = StepperProfile::new(4000, 20000);
        profile.move_to(10000);
        for _ in 0..200 {
            profile.advance(TICK);
        }
        let turn_point = profile.position();

        profile.move_to(0);
        profile.advance(TICK);
        assert!(profile.velocity() > 0.0, "must still be travelling forward");

        run_until_idle(&mut profile, 20000);
        assert!(turn_point > 0);
        assert_eq!(profile.position(), 0);
    }

    #[test]
    fn rebase_keeps_idle_axis_idle() {
        let mut profile = StepperProfile::new(4000, 20000);
        profile.move_to(300);
        run_until_idle(&mut profile, 5000);

        profile.set_current_position(-500);
        assert_eq!(profile.position(), -500);
        assert_eq!(profile.target(), -500);
        assert!(!profile.is_running());
    }
}
