// src/integrator.rs
//
// Fixed-step integration of a spin field with renormalisation after
// every step. The step strategies themselves never normalise; the
// integrator owns the unit-norm constraint.

use tracing::warn;

use crate::error::ConfigError;
use crate::spin_field::SpinField;

/// Absolute clock tolerance for `run_until`. Far below any physically
/// meaningful step size.
pub const TIME_EPSILON: f64 = 1e-16;

/// Closed set of fixed-step strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Euler,
    Rk4,
}

impl StepKind {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "euler" => Ok(Self::Euler),
            "rk4" => Ok(Self::Rk4),
            _ => Err(ConfigError::UnknownStepKind(name.to_string())),
        }
    }
}

/// Reusable stage buffers for the step functions.
pub struct StepScratch {
    k1: Vec<[f64; 3]>,
    k2: Vec<[f64; 3]>,
    k3: Vec<[f64; 3]>,
    k4: Vec<[f64; 3]>,
    tmp: Vec<[f64; 3]>,
}

impl StepScratch {
    pub fn new(n_sites: usize) -> Self {
        Self {
            k1: vec![[0.0; 3]; n_sites],
            k2: vec![[0.0; 3]; n_sites],
            k3: vec![[0.0; 3]; n_sites],
            k4: vec![[0.0; 3]; n_sites],
            tmp: vec![[0.0; 3]; n_sites],
        }
    }
}

/// One explicit Euler step: y <- y + h f(t, y). Returns the new time and
/// the number of rhs evaluations. `h` may be negative.
pub fn euler_step<F>(
    t: f64,
    y: &mut [[f64; 3]],
    h: f64,
    rhs: &mut F,
    scratch: &mut StepScratch,
) -> (f64, usize)
where
    F: FnMut(f64, &[[f64; 3]], &mut [[f64; 3]]),
{
    rhs(t, y, &mut scratch.k1);
    for (yi, ki) in y.iter_mut().zip(scratch.k1.iter()) {
        yi[0] += h * ki[0];
        yi[1] += h * ki[1];
        yi[2] += h * ki[2];
    }
    (t + h, 1)
}

/// One classical fourth-order Runge-Kutta step with weights
/// 1/6, 1/3, 1/3, 1/6 over midpoint and endpoint stages.
pub fn rk4_step<F>(
    t: f64,
    y: &mut [[f64; 3]],
    h: f64,
    rhs: &mut F,
    scratch: &mut StepScratch,
) -> (f64, usize)
where
    F: FnMut(f64, &[[f64; 3]], &mut [[f64; 3]]),
{
    let half = 0.5 * h;

    rhs(t, y, &mut scratch.k1);

    for ((ti, yi), ki) in scratch.tmp.iter_mut().zip(y.iter()).zip(scratch.k1.iter()) {
        ti[0] = yi[0] + half * ki[0];
        ti[1] = yi[1] + half * ki[1];
        ti[2] = yi[2] + half * ki[2];
    }
    rhs(t + half, &scratch.tmp, &mut scratch.k2);

    for ((ti, yi), ki) in scratch.tmp.iter_mut().zip(y.iter()).zip(scratch.k2.iter()) {
        ti[0] = yi[0] + half * ki[0];
        ti[1] = yi[1] + half * ki[1];
        ti[2] = yi[2] + half * ki[2];
    }
    rhs(t + half, &scratch.tmp, &mut scratch.k3);

    for ((ti, yi), ki) in scratch.tmp.iter_mut().zip(y.iter()).zip(scratch.k3.iter()) {
        ti[0] = yi[0] + h * ki[0];
        ti[1] = yi[1] + h * ki[1];
        ti[2] = yi[2] + h * ki[2];
    }
    rhs(t + h, &scratch.tmp, &mut scratch.k4);

    let w = h / 6.0;
    for (i, yi) in y.iter_mut().enumerate() {
        let k1 = scratch.k1[i];
        let k2 = scratch.k2[i];
        let k3 = scratch.k3[i];
        let k4 = scratch.k4[i];
        yi[0] += w * (k1[0] + 2.0 * k2[0] + 2.0 * k3[0] + k4[0]);
        yi[1] += w * (k1[1] + 2.0 * k2[1] + 2.0 * k3[1] + k4[1]);
        yi[2] += w * (k1[2] + 2.0 * k2[2] + 2.0 * k3[2] + k4[2]);
    }
    (t + h, 4)
}

/// Outcome of a `run_until` call. The fixed-step design cannot fail
/// mid-run; the variant exists for interface parity with integrators
/// that can.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
}

/// Fixed-step integrator that renormalises the spin field after every
/// step. The step kind is interchangeable between Euler and RK4.
pub struct StepIntegrator {
    kind: StepKind,
    stepsize: f64,
    t: f64,
    rhs_evals: u64,
    scratch: StepScratch,
}

impl StepIntegrator {
    pub fn new(step: &str, stepsize: f64, n_sites: usize) -> Result<Self, ConfigError> {
        if stepsize == 0.0 {
            return Err(ConfigError::ZeroStepSize);
        }
        Ok(Self {
            kind: StepKind::parse(step)?,
            stepsize,
            t: 0.0,
            rhs_evals: 0,
            scratch: StepScratch::new(n_sites),
        })
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn stepsize(&self) -> f64 {
        self.stepsize
    }

    /// Total rhs evaluations accumulated so far.
    pub fn rhs_evals(&self) -> u64 {
        self.rhs_evals
    }

    /// Switch the step strategy between runs.
    pub fn set_step(&mut self, step: &str) -> Result<(), ConfigError> {
        self.kind = StepKind::parse(step)?;
        Ok(())
    }

    /// Accepted for interface parity with adaptive integrators. Fixed-step
    /// strategies have no tolerance control, so this only emits a warning
    /// and leaves the run unaffected.
    pub fn set_tolerances(&mut self, _rtol: f64, _atol: f64) {
        warn!("tolerances are not available for a fixed-step integrator; keeping stepsize {}", self.stepsize);
    }

    /// Step until the clock reaches `target`, renormalising after every
    /// step. The last step may overshoot; no interpolation back to the
    /// exact target is performed.
    pub fn run_until<F>(&mut self, m: &mut SpinField, target: f64, rhs: &mut F) -> RunStatus
    where
        F: FnMut(f64, &[[f64; 3]], &mut [[f64; 3]]),
    {
        while (self.t - target).abs() > TIME_EPSILON {
            let (t_new, evals) = match self.kind {
                StepKind::Euler => euler_step(self.t, &mut m.data, self.stepsize, rhs, &mut self.scratch),
                StepKind::Rk4 => rk4_step(self.t, &mut m.data, self.stepsize, rhs, &mut self.scratch),
            };
            self.t = t_new;
            m.normalize_all();
            self.rhs_evals += evals as u64;
            if self.t > target {
                break;
            }
        }
        RunStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_unknown_step_kinds() {
        assert_eq!(StepKind::parse("euler"), Ok(StepKind::Euler));
        assert_eq!(StepKind::parse("rk4"), Ok(StepKind::Rk4));
        assert_eq!(
            StepKind::parse("rk45"),
            Err(ConfigError::UnknownStepKind("rk45".to_string()))
        );
    }

    #[test]
    fn zero_stepsize_is_a_config_error() {
        assert_eq!(
            StepIntegrator::new("euler", 0.0, 4).err(),
            Some(ConfigError::ZeroStepSize)
        );
    }

    #[test]
    fn step_kind_can_be_switched_between_runs() {
        let mut ig = StepIntegrator::new("euler", 0.1, 1).unwrap();
        assert!(ig.set_step("rk4").is_ok());
        assert_eq!(
            ig.set_step("verlet"),
            Err(ConfigError::UnknownStepKind("verlet".to_string()))
        );
    }

    #[test]
    fn rk4_step_is_reversible_to_high_order() {
        // Step forward then backward with -h; the mismatch is the local
        // truncation error, far below the step itself.
        let mut rhs = |_t: f64, y: &[[f64; 3]], dydt: &mut [[f64; 3]]| {
            for (d, v) in dydt.iter_mut().zip(y.iter()) {
                *d = [-v[1], v[0], 0.0];
            }
        };
        let mut y = vec![[1.0, 0.0, 0.0]];
        let mut scratch = StepScratch::new(1);
        let h = 1e-2;
        let (t1, _) = rk4_step(0.0, &mut y, h, &mut rhs, &mut scratch);
        let (t2, _) = rk4_step(t1, &mut y, -h, &mut rhs, &mut scratch);
        assert!(t2.abs() < 1e-18);
        assert!((y[0][0] - 1.0).abs() < 1e-11);
        assert!(y[0][1].abs() < 1e-11);
    }

    #[test]
    fn run_until_accepts_one_sided_overshoot() {
        let mut rhs = |_t: f64, _y: &[[f64; 3]], dydt: &mut [[f64; 3]]| {
            for d in dydt.iter_mut() {
                *d = [0.0; 3];
            }
        };
        let mut m = SpinField::uniform(2, [0.0, 0.0, 1.0]);
        let mut ig = StepIntegrator::new("euler", 0.3, 2).unwrap();
        let status = ig.run_until(&mut m, 1.0, &mut rhs);
        assert_eq!(status, RunStatus::Completed);
        // 4 steps of 0.3 overshoot to 1.2 and stop there
        assert!((ig.time() - 1.2).abs() < 1e-12);
        assert_eq!(ig.rhs_evals(), 4);
    }
}
