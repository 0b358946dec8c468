//! Per-sample smoothed parameters
//!
//! Gains and pans are never stepped while audio is running. Each parameter
//! follows a trajectory that is advanced once per rendered frame; scheduling a
//! new trajectory starts it from wherever the previous one currently is, so
//! the latest write always wins without a discontinuity.

/// Floor used for exponential ramps (an exponential curve can't reach 0)
pub const EXP_RAMP_FLOOR: f32 = 1.0e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Trajectory {
    /// Constant value
    Hold,
    /// Exponential approach toward `target` (one-pole smoothing)
    Approach { target: f32, coeff: f32 },
    /// Exponential ramp reaching `to` after `len` frames
    ExpRamp { from: f32, to: f32, pos: u32, len: u32 },
    /// Linear ramp reaching `to` after `len` frames
    LinearRamp { from: f32, to: f32, pos: u32, len: u32 },
}

/// A parameter value with a scheduled trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedParam {
    value: f32,
    trajectory: Trajectory,
}

impl SmoothedParam {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            trajectory: Trajectory::Hold,
        }
    }

    /// Current value (as of the last rendered frame)
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Value the current trajectory is heading to
    pub fn target(&self) -> f32 {
        match self.trajectory {
            Trajectory::Hold => self.value,
            Trajectory::Approach { target, .. } => target,
            Trajectory::ExpRamp { to, .. } | Trajectory::LinearRamp { to, .. } => to,
        }
    }

    /// Whether the parameter is still moving
    pub fn is_moving(&self) -> bool {
        !matches!(self.trajectory, Trajectory::Hold)
    }

    /// Jump to `value` immediately, cancelling any trajectory
    pub fn set(&mut self, value: f32) {
        self.value = value;
        self.trajectory = Trajectory::Hold;
    }

    /// Approach `target` with the given time constant in seconds
    ///
    /// After one time constant the value has covered ~63% of the distance.
    /// A non-positive time constant behaves like `set`.
    pub fn approach(&mut self, target: f32, time_constant: f64, sample_rate: u32) {
        let samples = time_constant * sample_rate as f64;
        if !(samples > 0.0) {
            self.set(target);
            return;
        }
        let coeff = (1.0 - (-1.0 / samples).exp()) as f32;
        self.trajectory = Trajectory::Approach { target, coeff };
    }

    /// Exponential ramp from the current value to `to` over `duration` seconds
    pub fn exp_ramp(&mut self, to: f32, duration: f64, sample_rate: u32) {
        let len = duration_frames(duration, sample_rate);
        if len == 0 {
            self.set(to);
            return;
        }
        self.trajectory = Trajectory::ExpRamp {
            from: self.value.max(EXP_RAMP_FLOOR),
            to: to.max(EXP_RAMP_FLOOR),
            pos: 0,
            len,
        };
    }

    /// Linear ramp from the current value to `to` over `duration` seconds
    pub fn linear_ramp(&mut self, to: f32, duration: f64, sample_rate: u32) {
        let len = duration_frames(duration, sample_rate);
        if len == 0 {
            self.set(to);
            return;
        }
        self.trajectory = Trajectory::LinearRamp {
            from: self.value,
            to,
            pos: 0,
            len,
        };
    }

    /// Advance one frame and return the new value
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        match &mut self.trajectory {
            Trajectory::Hold => {}
            Trajectory::Approach { target, coeff } => {
                let target = *target;
                self.value += (target - self.value) * *coeff;
                if (target - self.value).abs() < 1.0e-6 {
                    self.value = target;
                    self.trajectory = Trajectory::Hold;
                }
            }
            Trajectory::ExpRamp { from, to, pos, len } => {
                *pos += 1;
                if *pos >= *len {
                    self.value = *to;
                    self.trajectory = Trajectory::Hold;
                } else {
                    let t = *pos as f32 / *len as f32;
                    self.value = *from * (*to / *from).powf(t);
                }
            }
            Trajectory::LinearRamp { from, to, pos, len } => {
                *pos += 1;
                if *pos >= *len {
                    self.value = *to;
                    self.trajectory = Trajectory::Hold;
                } else {
                    let t = *pos as f32 / *len as f32;
                    self.value = *from + (*to - *from) * t;
                }
            }
        }
        self.value
    }
}

fn duration_frames(duration: f64, sample_rate: u32) -> u32 {
    if !duration.is_finite() || duration <= 0.0 {
        return 0;
    }
    (duration * sample_rate as f64).round().min(u32::MAX as f64) as u32
}
