use utilities::motion::AnalogInput;

use crate::engine::CarriageProbe;

const ADC_MAX: i64 = 1023;

/// Hall sensor fixed at `magnet_position` on the carriage's travel.
///
/// Outside the magnet's reach the reading rests at `midpoint`; inside it the
/// reading rises linearly to `midpoint + peak` directly over the magnet.
pub struct SimulatedHallSensor {
    probe: CarriageProbe,
    magnet_position: i64,
    magnet_width: i64,
    midpoint: i64,
    peak: i64,
    noise: i64,
    seed: u32,
}

impl SimulatedHallSensor {
    pub fn new(probe: CarriageProbe, magnet_position: i64, magnet_width: u32) -> Self {
        Self {
            probe,
            magnet_position,
            magnet_width: magnet_width.max(1) as i64,
            midpoint: 512,
            peak: 450,
            noise: 0,
            seed: 0x2545_f491,
        }
    }

    pub fn with_midpoint(mut self, midpoint: u16) -> Self {
        self.midpoint = midpoint as i64;
        self
    }

    /// Adds uniform noise in `[-amplitude, amplitude]` to every reading.
    pub fn with_noise(mut self, amplitude: u16) -> Self {
        self.noise = amplitude as i64;
        self
    }

    fn next_noise(&mut self) -> i64 {
        if self.noise == 0 {
            return 0;
        }

        // xorshift32
        self.seed ^= self.seed << 13;
        self.seed ^= self.seed >> 17;
        self.seed ^= self.seed << 5;

        (self.seed as i64 % (2 * self.noise + 1)) - self.noise
    }
}

impl AnalogInput for SimulatedHallSensor {
    fn read(&mut self) -> u16 {
        let distance = (self.probe.physical_position() - self.magnet_position).abs();
        let field = if distance < self.magnet_width {
            self.peak * (self.magnet_width - distance) / self.magnet_width
        } else {
            0
        };

        (self.midpoint + field + self.next_noise()).clamp(0, ADC_MAX) as u16
    }
}
