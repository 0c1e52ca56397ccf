//! Attitude Maneuver Oracle
//!
//! The interpreter asks an oracle to expand a maneuver between two attitudes
//! into time-ordered attitude samples, and to supply the normal sun mode
//! attitude when the spacecraft safes itself.

use serde::{Deserialize, Serialize};

use crate::attitude::{self, Quat};

/// One sampled attitude along a maneuver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttitudeSample {
    /// Mission seconds
    pub time: f64,
    pub quat: Quat,
    /// Sun pitch angle at `time`, degrees
    pub pitch: f64,
}

pub trait ManeuverOracle {
    /// Samples from `start` to `target` beginning at `tstart`.
    ///
    /// Implementations return at least two samples (start and end) in
    /// increasing time order.
    fn attitudes(&self, start: &Quat, target: &Quat, tstart: f64) -> Vec<AttitudeSample>;

    /// Attitude the spacecraft settles in after a normal sun mode safing
    /// action taken at `time` from `current`.
    fn nsm_attitude(&self, current: &Quat, time: f64) -> Quat;
}

/// Constant-rate great-circle maneuvers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlerpManeuverOracle {
    /// Slew rate, degrees per second
    pub rate_deg_per_sec: f64,
    /// Spacing of intermediate samples, seconds
    pub step_secs: f64,
}

impl Default for SlerpManeuverOracle {
    fn default() -> Self {
        Self {
            rate_deg_per_sec: 0.05,
            step_secs: 300.0,
        }
    }
}

impl ManeuverOracle for SlerpManeuverOracle {
    fn attitudes(&self, start: &Quat, target: &Quat, tstart: f64) -> Vec<AttitudeSample> {
        let angle = start.angle_to(target);
        let duration = if self.rate_deg_per_sec > 0.0 {
            angle / self.rate_deg_per_sec
        } else {
            0.0
        };
        let n_steps = if self.step_secs > 0.0 {
            ((duration / self.step_secs).ceil() as usize).max(1)
        } else {
            1
        };

        (0..=n_steps)
            .map(|i| {
                let frac = i as f64 / n_steps as f64;
                let time = tstart + duration * frac;
                let quat = start.slerp(target, frac);
                AttitudeSample {
                    time,
                    quat,
                    pitch: attitude::pitch(&quat, time),
                }
            })
            .collect()
    }

    fn nsm_attitude(&self, current: &Quat, time: f64) -> Quat {
        let (sun_ra, sun_dec) = attitude::sun_position(time);
        let sun = attitude::radec_to_eci(sun_ra, sun_dec);
        let t = current.normalized().transform();
        let z_axis = [t[0][2], t[1][2], t[2][2]];
        let x_axis = [t[0][0], t[1][0], t[2][0]];

        let cos_theta = dot(&z_axis, &sun).clamp(-1.0, 1.0);
        let mut axis = cross(&z_axis, &sun);
        let norm = dot(&axis, &axis).sqrt();
        if norm < 1e-12 {
            if cos_theta > 0.0 {
                return current.normalized();
            }
            // Sun on -Z: half turn about the pointing axis
            axis = x_axis;
        } else {
            axis = [axis[0] / norm, axis[1] / norm, axis[2] / norm];
        }

        let half = cos_theta.acos() / 2.0;
        let s = half.sin();
        let rotation = Quat::new(axis[0] * s, axis[1] * s, axis[2] * s, half.cos());
        rotation.mul(&current.normalized()).normalized()
    }
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}
