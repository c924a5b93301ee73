use utilities::{motion::AnalogInput, moving_average::MovingAverage};

const SAMPLES_PER_READING: usize = 3;

/// Conditions raw hall readings into a field strength: the mean of three
/// consecutive samples, as distance from the no-field midpoint.
pub struct HallSensor<S> {
    input: S,
    midpoint: i32,
    window: MovingAverage,
}

impl<S: AnalogInput> HallSensor<S> {
    pub fn new(input: S, midpoint: i32) -> Self {
        Self {
            input,
            midpoint,
            window: MovingAverage::new(SAMPLES_PER_READING),
        }
    }

    pub fn level(&mut self) -> i32 {
        self.window.clear();
        for _ in 0..SAMPLES_PER_READING {
            self.window.add(self.input.read() as i32);
        }

        (self.window.mean() - self.midpoint).abs()
    }
}
