// src/string_method.rs
//
// String-method relaxation of a band of spin-field images toward a
// minimum-energy path between two fixed endpoint states.
//
// Each iteration drives the interior images with the component of the
// effective field perpendicular to the local path tangent, advances them
// with the quick-min Verlet integrator, and periodically redistributes
// the images to equal arc-length spacing so they neither cluster in
// steep regions nor degenerate in flat ones. Relaxation ends when the
// largest per-image displacement rate falls below a threshold, or after
// a fixed iteration budget (a reported terminal state, not an error).

use tracing::{debug, warn};

use crate::band::{image_distance, image_dot, Band};
use crate::effective_field::EffectiveField;
use crate::error::ConfigError;
use crate::mesh::Mesh;
use crate::snapshot::BandSnapshots;
use crate::spin_field::SpinField;
use crate::vec3::dot;
use crate::verlet::VerletIntegrator;

/// An anchor configuration of the path: either one direction for every
/// site, or a per-site function of the site-centre position.
pub enum Anchor {
    Vector([f64; 3]),
    PerSite(Box<dyn Fn([f64; 3]) -> [f64; 3]>),
}

impl Anchor {
    fn realize(&self, mesh: &Mesh) -> SpinField {
        match self {
            Anchor::Vector(v) => SpinField::uniform(mesh.n_sites(), *v),
            Anchor::PerSite(f) => SpinField::from_fn(mesh, f),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StringSettings {
    /// Verlet step size.
    pub stepsize: f64,
    /// Verlet fictitious mass.
    pub mass: f64,
    /// Time advanced per relaxation iteration. Equal to `stepsize` means
    /// one Verlet step per iteration; a larger `dt` runs several.
    pub dt: f64,
    /// Stop when max_i |dY_i/dt| falls below this.
    pub stopping_dydt: f64,
    /// Iteration budget.
    pub max_iterations: usize,
    /// Redistribute images to equal arc length every this many
    /// iterations (0 disables).
    pub resample_every: usize,
    /// Record the per-image energies every this many iterations
    /// (0 disables).
    pub save_energies_every: usize,
    /// Record the full band every this many iterations (0 disables).
    pub save_band_every: usize,
}

impl Default for StringSettings {
    fn default() -> Self {
        Self {
            stepsize: 1e-4,
            mass: 0.1,
            dt: 1e-4,
            stopping_dydt: 1e-8,
            max_iterations: 1000,
            resample_every: 10,
            save_energies_every: 0,
            save_band_every: 0,
        }
    }
}

/// How a relaxation run terminated. Exhausting the iteration budget is a
/// reported terminal state, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Converged,
    MaxIterationsReached,
}

#[derive(Debug, Clone)]
pub struct StringRelaxReport {
    pub iterations: usize,
    pub stop_reason: StopReason,
    pub final_dydt: f64,
    /// Total energy per image of the relaxed band.
    pub energies: Vec<f64>,
    /// max(energies) - energies[0].
    pub barrier: f64,
}

pub struct StringMethod<'a, P: EffectiveField> {
    sim: &'a P,
    settings: StringSettings,
    band: Band,
    integrator: VerletIntegrator,

    // scratch buffers reused across iterations
    last: Band,
    resample_scratch: Band,
    field: Vec<[f64; 3]>,
    tangent: Vec<[f64; 3]>,
}

impl<'a, P: EffectiveField> StringMethod<'a, P> {
    /// Build the initial band by interpolating between consecutive
    /// anchors; `interpolations[k]` intermediate images are inserted
    /// between anchors k and k+1, so the band holds
    /// sum(interpolations) + anchors.len() images in total.
    pub fn new(
        sim: &'a P,
        mesh: &Mesh,
        anchors: &[Anchor],
        interpolations: &[usize],
        settings: StringSettings,
    ) -> Result<Self, ConfigError> {
        if anchors.len() < 2 {
            return Err(ConfigError::TooFewAnchors(anchors.len()));
        }
        if interpolations.len() != anchors.len() - 1 {
            return Err(ConfigError::InterpolationCountMismatch {
                anchors: anchors.len(),
                counts: interpolations.len(),
            });
        }
        if settings.dt == 0.0 {
            return Err(ConfigError::ZeroStepSize);
        }

        let n_sites = mesh.n_sites();
        let n_images = interpolations.iter().sum::<usize>() + anchors.len();
        let integrator = VerletIntegrator::new(n_images, n_sites, settings.mass, settings.stepsize)?;

        let mut band = Band::zeros(n_images, n_sites);
        let mut idx = 0;
        for (k, pair) in anchors.windows(2).enumerate() {
            let a = pair[0].realize(mesh);
            let b = pair[1].realize(mesh);
            band.image_mut(idx).copy_from_slice(&a.data);
            idx += 1;
            let count = interpolations[k];
            for j in 1..=count {
                let frac = j as f64 / (count + 1) as f64;
                let dst = band.image_mut(idx);
                for (site, (va, vb)) in dst.iter_mut().zip(a.data.iter().zip(b.data.iter())) {
                    *site = interpolate_spin(*va, *vb, frac);
                }
                idx += 1;
            }
        }
        let end = anchors.last().unwrap().realize(mesh);
        band.image_mut(idx).copy_from_slice(&end.data);

        band.normalize_all();
        let ms = sim.saturation();
        for i in 0..n_images {
            for (v, &w) in band.image_mut(i).iter_mut().zip(ms.iter()) {
                if w == 0.0 {
                    *v = [0.0; 3];
                }
            }
        }

        Ok(Self {
            sim,
            settings,
            last: band.clone(),
            resample_scratch: band.clone(),
            band,
            integrator,
            field: vec![[0.0; 3]; n_sites],
            tangent: vec![[0.0; 3]; n_sites],
        })
    }

    pub fn band(&self) -> &Band {
        &self.band
    }

    pub fn settings(&self) -> &StringSettings {
        &self.settings
    }

    /// Total energy of every image, first to last.
    pub fn energy_profile(&self) -> Vec<f64> {
        (0..self.band.n_images())
            .map(|i| self.sim.compute_energy(self.band.image(i)))
            .collect()
    }

    /// Relax the band. Snapshots, when requested in the settings, go to
    /// `snapshots`; a failed write is reported on the diagnostic channel
    /// and does not interrupt the relaxation.
    pub fn relax(&mut self, mut snapshots: Option<&mut dyn BandSnapshots>) -> StringRelaxReport {
        let dt = self.settings.dt;
        let mut dydt = f64::INFINITY;
        let mut iterations = 0;
        let mut stop_reason = StopReason::MaxIterationsReached;

        self.record(0, &mut snapshots);

        for it in 1..=self.settings.max_iterations {
            self.last.copy_from(&self.band);

            {
                let Self { sim, band, integrator, field, tangent, .. } = &mut *self;
                let target = integrator.time() + dt;
                let mut rhs = |t: f64, b: &Band, forces: &mut Band| {
                    compute_drive(*sim, t, b, forces, field, tangent)
                };
                integrator.run_until(band, target, &mut rhs);
            }

            if self.settings.resample_every > 0 && it % self.settings.resample_every == 0 {
                reparametrize(&mut self.band, &mut self.resample_scratch);
                // the stored Verlet momentum belongs to the old image
                // positions along the path
                self.integrator.reset();
            }

            dydt = (1..self.band.n_images() - 1)
                .map(|i| image_distance(self.band.image(i), self.last.image(i)) / dt)
                .fold(0.0, f64::max);
            iterations = it;

            self.record(it, &mut snapshots);
            debug!(iteration = it, dydt, "string step");

            if dydt < self.settings.stopping_dydt {
                stop_reason = StopReason::Converged;
                break;
            }
        }

        let energies = self.energy_profile();
        let barrier = energy_barrier(&energies);
        StringRelaxReport {
            iterations,
            stop_reason,
            final_dydt: dydt,
            energies,
            barrier,
        }
    }

    fn record(&self, iteration: usize, snapshots: &mut Option<&mut dyn BandSnapshots>) {
        let Some(writer) = snapshots.as_deref_mut() else {
            return;
        };
        let every_e = self.settings.save_energies_every;
        if every_e > 0 && iteration % every_e == 0 {
            let energies = self.energy_profile();
            if let Err(err) = writer.record_energies(iteration, &energies) {
                warn!(iteration, %err, "failed to record energy profile");
            }
        }
        let every_b = self.settings.save_band_every;
        if every_b > 0 && iteration % every_b == 0 {
            if let Err(err) = writer.record_band(iteration, &self.band) {
                warn!(iteration, %err, "failed to record band");
            }
        }
    }
}

/// Energy barrier of a profile: highest image relative to the first.
pub fn energy_barrier(energies: &[f64]) -> f64 {
    let max = energies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    max - energies[0]
}

/// Linear interpolation between two spin directions in spherical angles.
/// Zero vectors land on the pole and are cleaned up by the zero-weight
/// mask afterwards.
fn interpolate_spin(a: [f64; 3], b: [f64; 3], frac: f64) -> [f64; 3] {
    let (ta, pa) = to_spherical(a);
    let (tb, pb) = to_spherical(b);
    let theta = ta + frac * (tb - ta);
    let phi = pa + frac * (pb - pa);
    [
        theta.sin() * phi.cos(),
        theta.sin() * phi.sin(),
        theta.cos(),
    ]
}

#[inline]
fn to_spherical(v: [f64; 3]) -> (f64, f64) {
    let theta = (v[0] * v[0] + v[1] * v[1]).sqrt().atan2(v[2]);
    let phi = v[1].atan2(v[0]);
    (theta, phi)
}

/// Drive for one Verlet step: per interior image, the effective field
/// with its spin-parallel component removed (so the drive lies in the
/// tangent plane of every unit sphere) and its path-tangent component
/// removed (so relaxation moves images onto the path, not along it).
/// Endpoint images get zero drive.
fn compute_drive<P: EffectiveField>(
    sim: &P,
    t: f64,
    band: &Band,
    forces: &mut Band,
    field: &mut [[f64; 3]],
    tangent: &mut [[f64; 3]],
) {
    let n_images = band.n_images();
    for v in forces.image_mut(0).iter_mut() {
        *v = [0.0; 3];
    }
    for v in forces.image_mut(n_images - 1).iter_mut() {
        *v = [0.0; 3];
    }

    for i in 1..n_images - 1 {
        let y = band.image(i);
        sim.compute_field(t, y, field);

        for (g, m) in field.iter_mut().zip(y.iter()) {
            let gm = dot(*g, *m);
            g[0] -= gm * m[0];
            g[1] -= gm * m[1];
            g[2] -= gm * m[2];
        }

        let prev = band.image(i - 1);
        let next = band.image(i + 1);
        for ((tv, p), nx) in tangent.iter_mut().zip(prev.iter()).zip(next.iter()) {
            tv[0] = nx[0] - p[0];
            tv[1] = nx[1] - p[1];
            tv[2] = nx[2] - p[2];
        }
        let tnorm = image_dot(tangent, tangent).sqrt();
        if tnorm > 0.0 {
            let inv = 1.0 / tnorm;
            for tv in tangent.iter_mut() {
                tv[0] *= inv;
                tv[1] *= inv;
                tv[2] *= inv;
            }
            let gt = image_dot(field, tangent);
            for (g, tv) in field.iter_mut().zip(tangent.iter()) {
                g[0] -= gt * tv[0];
                g[1] -= gt * tv[1];
                g[2] -= gt * tv[2];
            }
        }

        forces.image_mut(i).copy_from_slice(field);
    }
}

/// Redistribute the interior images to equal spacing along the path,
/// measured as cumulative Euclidean distance between consecutive images,
/// by per-dof linear interpolation followed by renormalisation. Image
/// count and endpoints are preserved.
pub fn reparametrize(band: &mut Band, scratch: &mut Band) {
    let n = band.n_images();
    scratch.copy_from(band);

    let mut cum = vec![0.0; n];
    for i in 1..n {
        cum[i] = cum[i - 1] + image_distance(scratch.image(i - 1), scratch.image(i));
    }
    let total = cum[n - 1];
    if total == 0.0 {
        return;
    }
    for c in cum.iter_mut() {
        *c /= total;
    }

    for j in 1..n - 1 {
        let pos = j as f64 / (n - 1) as f64;
        let mut k = 0;
        while k < n - 2 && cum[k + 1] < pos {
            k += 1;
        }
        let seg = cum[k + 1] - cum[k];
        let frac = if seg > 0.0 { (pos - cum[k]) / seg } else { 0.0 };

        let dst = band.image_mut(j);
        let a = scratch.image(k);
        let b = scratch.image(k + 1);
        for ((d, va), vb) in dst.iter_mut().zip(a.iter()).zip(b.iter()) {
            d[0] = va[0] + frac * (vb[0] - va[0]);
            d[1] = va[1] + frac * (vb[1] - va[1]);
            d[2] = va[2] + frac * (vb[2] - va[2]);
        }
    }

    band.normalize_all();
}
