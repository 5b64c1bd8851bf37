// src/verlet.rs
//
// Quick-min velocity Verlet over a band of images. This is a
// minimisation-style integrator, not energy-conserving dynamics: each
// step keeps only the velocity component parallel to the force, and a
// direction reversal discards the accumulated momentum entirely.
// See J. Chem. Theory Comput. 13, 3250 (2017).

use crate::band::{image_dot, Band};
use crate::error::ConfigError;
use crate::integrator::{RunStatus, TIME_EPSILON};

pub struct VerletIntegrator {
    mass: f64,
    stepsize: f64,
    t: f64,
    velocity: Band,
    forces: Band,
    forces_prev: Band,
}

impl VerletIntegrator {
    pub fn new(n_images: usize, n_sites: usize, mass: f64, stepsize: f64) -> Result<Self, ConfigError> {
        if mass <= 0.0 {
            return Err(ConfigError::NonPositiveMass(mass));
        }
        if stepsize == 0.0 {
            return Err(ConfigError::ZeroStepSize);
        }
        Ok(Self {
            mass,
            stepsize,
            t: 0.0,
            velocity: Band::zeros(n_images, n_sites),
            forces: Band::zeros(n_images, n_sites),
            forces_prev: Band::zeros(n_images, n_sites),
        })
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn stepsize(&self) -> f64 {
        self.stepsize
    }

    pub fn velocity(&self) -> &Band {
        &self.velocity
    }

    /// Zero the velocity and stored-force buffers. Required whenever the
    /// band is reshaped behind the integrator's back (e.g. after the
    /// images have been redistributed along the path), since the stored
    /// momentum belongs to the old image positions.
    pub fn reset(&mut self) {
        self.velocity.fill_zero();
        self.forces.fill_zero();
        self.forces_prev.fill_zero();
    }

    /// Step until the clock reaches `target`, with the same one-sided
    /// overshoot semantics as the fixed-step spin integrator.
    pub fn run_until<F>(&mut self, band: &mut Band, target: f64, rhs: &mut F) -> RunStatus
    where
        F: FnMut(f64, &Band, &mut Band),
    {
        while (self.t - target).abs() > TIME_EPSILON {
            self.step(band, rhs);
            if self.t > target {
                break;
            }
        }
        RunStatus::Completed
    }

    /// One quick-min velocity Verlet step over the interior images.
    /// Endpoint images are never advanced; the whole band (endpoints
    /// included) is renormalised afterwards.
    pub fn step<F>(&mut self, band: &mut Band, rhs: &mut F)
    where
        F: FnMut(f64, &Band, &mut Band),
    {
        let h = self.stepsize;
        let half = h / (2.0 * self.mass);
        let full = h / self.mass;
        let n_images = band.n_images();

        rhs(self.t, band, &mut self.forces);

        for i in 1..n_images - 1 {
            let force = self.forces.image(i);
            let force_prev = self.forces_prev.image(i);
            let vel = self.velocity.image_mut(i);

            // Velocity Verlet pre-update from the mean of the previous
            // and current forces.
            for ((v, f), fp) in vel.iter_mut().zip(force.iter()).zip(force_prev.iter()) {
                v[0] += half * (fp[0] + f[0]);
                v[1] += half * (fp[1] + f[1]);
                v[2] += half * (fp[2] + f[2]);
            }

            let proj = image_dot(force, vel);
            let force_norm_2 = image_dot(force, force);

            // Quick-min: keep only the velocity component parallel to the
            // force. A reversal (or a vanished force) discards all stored
            // momentum; the zero-force branch also avoids the 0/0 division.
            if proj <= 0.0 || force_norm_2 == 0.0 {
                for v in vel.iter_mut() {
                    *v = [0.0; 3];
                }
            } else {
                let factor = proj / force_norm_2;
                for (v, f) in vel.iter_mut().zip(force.iter()) {
                    v[0] = factor * f[0];
                    v[1] = factor * f[1];
                    v[2] = factor * f[2];
                }
            }

            // Second half-kick.
            for (v, f) in vel.iter_mut().zip(force.iter()) {
                v[0] += full * f[0];
                v[1] += full * f[1];
                v[2] += full * f[2];
            }

            let y = band.image_mut(i);
            for ((yi, v), f) in y.iter_mut().zip(self.velocity.image(i).iter()).zip(force.iter()) {
                yi[0] += h * (v[0] + half * f[0]);
                yi[1] += h * (v[1] + half * f[1]);
                yi[2] += h * (v[2] + half * f[2]);
            }
        }

        self.forces_prev.copy_from(&self.forces);
        band.normalize_all();
        self.t += h;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_mass_is_rejected_eagerly() {
        assert_eq!(
            VerletIntegrator::new(3, 1, 0.0, 1e-4).err(),
            Some(ConfigError::NonPositiveMass(0.0))
        );
        assert_eq!(
            VerletIntegrator::new(3, 1, -0.5, 1e-4).err(),
            Some(ConfigError::NonPositiveMass(-0.5))
        );
        assert!(VerletIntegrator::new(3, 1, 0.1, 1e-4).is_ok());
    }

    #[test]
    fn zero_force_leaves_band_and_velocity_untouched() {
        let mut band = Band::zeros(3, 2);
        for i in 0..3 {
            for v in band.image_mut(i).iter_mut() {
                *v = [0.0, 0.0, 1.0];
            }
        }
        let before = band.clone();

        let mut ig = VerletIntegrator::new(3, 2, 0.1, 1e-2).unwrap();
        let mut rhs = |_t: f64, _band: &Band, forces: &mut Band| forces.fill_zero();
        ig.step(&mut band, &mut rhs);

        assert_eq!(band, before);
        for v in ig.velocity().image(1) {
            assert_eq!(*v, [0.0; 3]);
        }
    }

    #[test]
    fn endpoints_are_never_advanced() {
        let mut band = Band::zeros(4, 1);
        band.image_mut(0)[0] = [1.0, 0.0, 0.0];
        band.image_mut(1)[0] = [0.0, 1.0, 0.0];
        band.image_mut(2)[0] = [0.0, 0.0, 1.0];
        band.image_mut(3)[0] = [-1.0, 0.0, 0.0];

        let mut ig = VerletIntegrator::new(4, 1, 0.1, 1e-2).unwrap();
        let mut rhs = |_t: f64, _band: &Band, forces: &mut Band| {
            for i in 0..4 {
                forces.image_mut(i)[0] = [0.3, -0.2, 0.1];
            }
        };
        for _ in 0..5 {
            ig.step(&mut band, &mut rhs);
        }

        assert_eq!(band.image(0)[0], [1.0, 0.0, 0.0]);
        assert_eq!(band.image(3)[0], [-1.0, 0.0, 0.0]);
        assert_ne!(band.image(1)[0], [0.0, 1.0, 0.0]);
    }
}
