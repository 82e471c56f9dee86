//! A PID (Proportional-Integral-Derivative) controller for heater duty
//! cycle control.
//!
//! Unlike a generic PID with an integral limit derived from `output_max/ki`,
//! this clamps the integral term to a fixed bound and additionally "unwinds"
//! the integral term whenever the output saturates and the error is still
//! pushing it further into saturation — plain clamping alone lets the
//! integral keep growing unboundedly while saturated, which then causes
//! overshoot once the setpoint is finally approached.

use num_traits::{Float, Signed};

/// A PID controller tuned for a 0.0..=1.0 PWM duty cycle output.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pid<F: Float + Signed> {
    /// Proportional gain.
    pub kp: F,
    /// Integral gain.
    pub ki: F,
    /// Derivative gain.
    pub kd: F,

    /// The target value for the system.
    pub setpoint: F,

    /// The lower bound of the controller's output.
    pub output_min: F,
    /// The upper bound of the controller's output.
    pub output_max: F,
    /// Fixed bound on the accumulated integral term, independent of `ki`.
    pub integral_max: F,

    // Internal state
    integral: F,
    previous_error: F,
}

impl<F: Float + Signed> Pid<F> {
    /// Creates a new PID controller with an integral bound of 100.0 and a
    /// `[0, 1]` output range.
    pub fn new(kp: F, ki: F, kd: F, setpoint: F) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint,
            output_min: F::zero(),
            output_max: F::one(),
            integral_max: F::from(100.0).unwrap(),
            integral: F::zero(),
            previous_error: F::zero(),
        }
    }

    /// Updates the PID controller with a new measurement, returning the
    /// next output in `[output_min, output_max]`.
    ///
    /// `dt` is the time delta since the last update, in seconds.
    pub fn update(&mut self, current_value: F, dt: F) -> F {
        let error = self.setpoint - current_value;

        self.integral = self.integral + error * dt;
        self.integral = self.integral.max(-self.integral_max).min(self.integral_max);

        let derivative = (error - self.previous_error) / dt;
        self.previous_error = error;

        let mut output = self.kp * error + self.ki * self.integral + self.kd * derivative;

        if output < self.output_min {
            output = self.output_min;
            if error.is_negative() && self.integral.is_negative() {
                self.integral = self.integral - error * dt;
            }
        } else if output > self.output_max {
            output = self.output_max;
            if error.is_positive() && self.integral.is_positive() {
                self.integral = self.integral - error * dt;
            }
        }

        output
    }

    /// Resets the internal state of the PID controller (e.g. after a
    /// setpoint change large enough to invalidate the accumulated history).
    pub fn reset(&mut self) {
        self.integral = F::zero();
        self.previous_error = F::zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_stays_within_duty_cycle_bounds() {
        let mut pid: Pid<f64> = Pid::new(0.5, 0.1, 0.05, 200.0);
        for _ in 0..200 {
            let out = pid.update(20.0, 0.1);
            assert!(out >= 0.0 && out <= 1.0);
        }
    }

    #[test]
    fn integral_is_bounded_even_under_sustained_error() {
        let mut pid: Pid<f64> = Pid::new(0.0, 1.0, 0.0, 1000.0);
        for _ in 0..1000 {
            pid.update(0.0, 0.1);
        }
        assert!(pid.integral.abs() <= pid.integral_max + 1e-9);
    }

    #[test]
    fn unwind_shrinks_integral_when_saturated_and_error_still_growing_it() {
        let mut pid: Pid<f64> = Pid::new(0.0, 2.0, 0.0, 1000.0);
        // Saturate high first.
        for _ in 0..50 {
            pid.update(0.0, 0.1);
        }
        let integral_before = pid.integral;
        pid.update(0.0, 0.1);
        // With output pinned at output_max and error still positive, the
        // unwind step should have pulled the integral back down rather than
        // let it keep climbing past the clamp.
        assert!(pid.integral <= integral_before);
    }

    #[test]
    fn reset_clears_history() {
        let mut pid: Pid<f64> = Pid::new(1.0, 1.0, 1.0, 50.0);
        pid.update(10.0, 0.1);
        pid.reset();
        assert_eq!(pid.update(50.0, 0.1), 0.0);
    }
}
