//! Attitude quaternions, sky geometry and the solar pitch angle
//!
//! Quaternions are scalar-last (`q4` is the scalar part). The attitude's
//! pointing direction is the body X axis; `ra`/`dec` locate it on the sky and
//! `roll` is the rotation about it.

use serde::{Deserialize, Serialize};

/// Attitude quaternion, scalar last
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub q4: f64,
}

type Matrix = [[f64; 3]; 3];

impl Quat {
    pub fn new(q1: f64, q2: f64, q3: f64, q4: f64) -> Self {
        Self { q1, q2, q3, q4 }
    }

    /// Quaternion for the attitude pointing at `ra`, `dec` with `roll` (degrees)
    pub fn from_equatorial(ra: f64, dec: f64, roll: f64) -> Self {
        let (sa, ca) = ra.to_radians().sin_cos();
        let (sd, cd) = dec.to_radians().sin_cos();
        let (sr, cr) = roll.to_radians().sin_cos();
        let t = [
            [ca * cd, -ca * sd * sr - sa * cr, -ca * sd * cr + sa * sr],
            [sa * cd, -sa * sd * sr + ca * cr, -sa * sd * cr - ca * sr],
            [sd, cd * sr, cd * cr],
        ];
        Self::from_transform(&t)
    }

    fn from_transform(t: &Matrix) -> Self {
        let den = [
            1.0 + t[0][0] - t[1][1] - t[2][2],
            1.0 - t[0][0] + t[1][1] - t[2][2],
            1.0 - t[0][0] - t[1][1] + t[2][2],
            1.0 + t[0][0] + t[1][1] + t[2][2],
        ];
        let (max_idx, max_den) = den
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, d)| if d > best.1 { (i, d) } else { best });

        let mut q = [0.0; 4];
        q[max_idx] = 0.5 * max_den.sqrt();
        let denom = 4.0 * q[max_idx];
        match max_idx {
            0 => {
                q[1] = (t[1][0] + t[0][1]) / denom;
                q[2] = (t[2][0] + t[0][2]) / denom;
                q[3] = (t[2][1] - t[1][2]) / denom;
            }
            1 => {
                q[0] = (t[1][0] + t[0][1]) / denom;
                q[2] = (t[2][1] + t[1][2]) / denom;
                q[3] = (t[0][2] - t[2][0]) / denom;
            }
            2 => {
                q[0] = (t[2][0] + t[0][2]) / denom;
                q[1] = (t[2][1] + t[1][2]) / denom;
                q[3] = (t[1][0] - t[0][1]) / denom;
            }
            _ => {
                q[0] = (t[2][1] - t[1][2]) / denom;
                q[1] = (t[0][2] - t[2][0]) / denom;
                q[2] = (t[1][0] - t[0][1]) / denom;
            }
        }
        Self::new(q[0], q[1], q[2], q[3]).canonical()
    }

    /// Body-to-ECI rotation matrix
    pub fn transform(&self) -> Matrix {
        let Quat { q1: x, q2: y, q3: z, q4: w } = self.normalized();
        [
            [
                1.0 - 2.0 * (y * y + z * z),
                2.0 * (x * y - w * z),
                2.0 * (z * x + w * y),
            ],
            [
                2.0 * (x * y + w * z),
                1.0 - 2.0 * (x * x + z * z),
                2.0 * (y * z - w * x),
            ],
            [
                2.0 * (z * x - w * y),
                2.0 * (y * z + w * x),
                1.0 - 2.0 * (x * x + y * y),
            ],
        ]
    }

    fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    fn dot(&self, other: &Quat) -> f64 {
        self.q1 * other.q1 + self.q2 * other.q2 + self.q3 * other.q3 + self.q4 * other.q4
    }

    fn scaled(&self, k: f64) -> Quat {
        Quat::new(self.q1 * k, self.q2 * k, self.q3 * k, self.q4 * k)
    }

    pub fn normalized(&self) -> Quat {
        let n = self.norm();
        if n == 0.0 {
            *self
        } else {
            self.scaled(1.0 / n)
        }
    }

    /// Same rotation with a non-negative scalar part
    fn canonical(self) -> Quat {
        if self.q4 < 0.0 {
            self.scaled(-1.0)
        } else {
            self
        }
    }

    /// Right ascension of the pointing direction, degrees in [0, 360)
    pub fn ra(&self) -> f64 {
        let t = self.transform();
        wrap_360(t[1][0].atan2(t[0][0]).to_degrees())
    }

    /// Declination of the pointing direction, degrees
    pub fn dec(&self) -> f64 {
        let t = self.transform();
        t[2][0]
            .atan2((t[0][0] * t[0][0] + t[1][0] * t[1][0]).sqrt())
            .to_degrees()
    }

    /// Roll about the pointing direction, degrees in [0, 360)
    pub fn roll(&self) -> f64 {
        let t = self.transform();
        wrap_360(t[2][1].atan2(t[2][2]).to_degrees())
    }

    /// Rotation angle between two attitudes, degrees
    pub fn angle_to(&self, other: &Quat) -> f64 {
        let d = self.normalized().dot(&other.normalized()).abs().min(1.0);
        2.0 * d.acos().to_degrees()
    }

    /// Spherical linear interpolation, `frac` in [0, 1]
    pub fn slerp(&self, other: &Quat, frac: f64) -> Quat {
        let a = self.normalized();
        let mut b = other.normalized();
        let mut d = a.dot(&b);
        if d < 0.0 {
            b = b.scaled(-1.0);
            d = -d;
        }
        if d > 0.999_999_9 {
            let lerp = Quat::new(
                a.q1 + (b.q1 - a.q1) * frac,
                a.q2 + (b.q2 - a.q2) * frac,
                a.q3 + (b.q3 - a.q3) * frac,
                a.q4 + (b.q4 - a.q4) * frac,
            );
            return lerp.normalized();
        }
        let theta = d.acos();
        let s = theta.sin();
        let wa = ((1.0 - frac) * theta).sin() / s;
        let wb = (frac * theta).sin() / s;
        Quat::new(
            a.q1 * wa + b.q1 * wb,
            a.q2 * wa + b.q2 * wb,
            a.q3 * wa + b.q3 * wb,
            a.q4 * wa + b.q4 * wb,
        )
        .normalized()
    }

    /// Rotate an ECI vector into the body frame
    pub fn eci_to_body(&self, v: [f64; 3]) -> [f64; 3] {
        let t = self.transform();
        let mut out = [0.0; 3];
        for (j, o) in out.iter_mut().enumerate() {
            *o = (0..3).map(|i| t[i][j] * v[i]).sum();
        }
        out
    }

    /// Compose with a body-frame rotation: self * other
    pub fn mul(&self, o: &Quat) -> Quat {
        let (x1, y1, z1, w1) = (self.q1, self.q2, self.q3, self.q4);
        let (x2, y2, z2, w2) = (o.q1, o.q2, o.q3, o.q4);
        Quat::new(
            w1 * x2 + x1 * w2 + y1 * z2 - z1 * y2,
            w1 * y2 - x1 * z2 + y1 * w2 + z1 * x2,
            w1 * z2 + x1 * y2 - y1 * x2 + z1 * w2,
            w1 * w2 - x1 * x2 - y1 * y2 - z1 * z2,
        )
    }
}

fn wrap_360(deg: f64) -> f64 {
    if deg < 0.0 {
        deg + 360.0
    } else {
        deg
    }
}

/// Great-circle separation in degrees between two sky positions (degrees)
pub fn sph_dist(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    if ra1 == ra2 && dec1 == dec2 {
        return 0.0;
    }
    let (ra1, dec1, ra2, dec2) = (
        ra1.to_radians(),
        dec1.to_radians(),
        ra2.to_radians(),
        dec2.to_radians(),
    );
    let hav = ((dec2 - dec1) / 2.0).sin().powi(2)
        + dec1.cos() * dec2.cos() * ((ra2 - ra1) / 2.0).sin().powi(2);
    (2.0 * hav.sqrt().min(1.0).asin()).to_degrees()
}

/// Unit vector for a sky position (degrees)
pub fn radec_to_eci(ra: f64, dec: f64) -> [f64; 3] {
    let (sa, ca) = ra.to_radians().sin_cos();
    let (sd, cd) = dec.to_radians().sin_cos();
    [ca * cd, sa * cd, sd]
}

/// Apparent solar position (ra, dec in degrees) at mission seconds `secs`.
///
/// Low-precision ephemeris, good to about 0.01 degree.
pub fn sun_position(secs: f64) -> (f64, f64) {
    // Days from J2000.0; mission epoch is JD 2450814.5
    let n = secs / 86400.0 - 730.5;
    let mean_long = (280.460 + 0.985_647_4 * n).rem_euclid(360.0);
    let mean_anom = (357.528 + 0.985_600_3 * n).rem_euclid(360.0).to_radians();
    let ecl_long = (mean_long + 1.915 * mean_anom.sin() + 0.020 * (2.0 * mean_anom).sin())
        .to_radians();
    let obliquity = (23.439 - 0.000_000_4 * n).to_radians();

    let ra = (obliquity.cos() * ecl_long.sin()).atan2(ecl_long.cos());
    let dec = (obliquity.sin() * ecl_long.sin()).asin();
    (wrap_360(ra.to_degrees()), dec.to_degrees())
}

/// Sun pitch angle (degrees) of attitude `att` at mission seconds `secs`
pub fn pitch(att: &Quat, secs: f64) -> f64 {
    let (sun_ra, sun_dec) = sun_position(secs);
    sph_dist(att.ra(), att.dec(), sun_ra, sun_dec)
}
