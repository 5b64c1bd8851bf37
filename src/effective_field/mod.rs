// src/effective_field/mod.rs
//
// Effective-field providers. The integration and path-relaxation core
// only ever sees the `EffectiveField` trait; `FieldSet` is the local
// reference implementation carrying the two on-site terms the built-in
// validation scenarios need. Non-local terms (exchange, DMI, demag)
// would plug in behind the same trait.

pub mod anisotropy;
pub mod zeeman;

use crate::mesh::Mesh;

pub use anisotropy::UniaxialAnisotropy;
pub use zeeman::Zeeman;

/// Vacuum permeability (T m / A).
pub const MU0: f64 = 4.0e-7 * std::f64::consts::PI;

/// A drive provider: given time and a spin configuration, fill in the
/// effective field (same shape), and evaluate the total energy.
/// Implementations must be pure in `(t, m)` so they can be called
/// repeatedly inside multi-stage steps.
pub trait EffectiveField {
    fn compute_field(&self, t: f64, m: &[[f64; 3]], h_eff: &mut [[f64; 3]]);

    fn compute_energy(&self, m: &[[f64; 3]]) -> f64;

    /// Per-site saturation magnetisation (A/m). Sites with weight zero
    /// are excluded from the dynamics and the unit-norm constraint.
    fn saturation(&self) -> &[f64];
}

/// Sum of local field terms over a mesh with per-site saturation.
pub struct FieldSet {
    mesh: Mesh,
    ms: Vec<f64>,
    anisotropy: Option<UniaxialAnisotropy>,
    zeeman: Option<Zeeman>,

    /// Enable Rayon parallelism for the per-site field pass. Off by
    /// default for maximal reproducibility.
    pub parallel: bool,
}

impl FieldSet {
    /// Uniform saturation on every site.
    pub fn new(mesh: &Mesh, ms: f64) -> Self {
        Self {
            mesh: *mesh,
            ms: vec![ms; mesh.n_sites()],
            anisotropy: None,
            zeeman: None,
            parallel: false,
        }
    }

    /// Spatially varying saturation from a function of the site-centre
    /// position (lattice units). Returning 0 marks a site non-magnetic.
    pub fn with_saturation_fn<F>(mesh: &Mesh, f: F) -> Self
    where
        F: Fn([f64; 3]) -> f64,
    {
        let ms = (0..mesh.n_sites()).map(|i| f(mesh.site_center(i))).collect();
        Self {
            mesh: *mesh,
            ms,
            anisotropy: None,
            zeeman: None,
            parallel: false,
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn add_uniaxial_anisotropy(&mut self, ku: f64, axis: [f64; 3]) -> &mut Self {
        self.anisotropy = Some(UniaxialAnisotropy::new(ku, axis));
        self
    }

    pub fn add_zeeman(&mut self, h_ext: [f64; 3]) -> &mut Self {
        self.zeeman = Some(Zeeman::new(h_ext));
        self
    }
}

impl EffectiveField for FieldSet {
    fn compute_field(&self, _t: f64, m: &[[f64; 3]], h_eff: &mut [[f64; 3]]) {
        debug_assert_eq!(m.len(), self.ms.len());
        debug_assert_eq!(h_eff.len(), self.ms.len());

        for h in h_eff.iter_mut() {
            *h = [0.0; 3];
        }

        if let Some(zee) = &self.zeeman {
            zee.add_field(&self.ms, h_eff, self.parallel);
        }
        if let Some(ani) = &self.anisotropy {
            ani.add_field(m, &self.ms, h_eff, self.parallel);
        }
    }

    fn compute_energy(&self, m: &[[f64; 3]]) -> f64 {
        let dv = self.mesh.cell_volume();
        let mut e = 0.0;
        if let Some(zee) = &self.zeeman {
            e += zee.energy(m, &self.ms, dv);
        }
        if let Some(ani) = &self.anisotropy {
            e += ani.energy(m, &self.ms, dv);
        }
        e
    }

    fn saturation(&self) -> &[f64] {
        &self.ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_set_sums_terms_and_zeroes_unweighted_sites() {
        let mesh = Mesh::new(2, 1, 1, 1.0, 1.0, 1.0, 1e-9);
        let mut sim = FieldSet::with_saturation_fn(&mesh, |pos| if pos[0] < 1.0 { 1e5 } else { 0.0 });
        sim.add_uniaxial_anisotropy(1e4, [0.0, 0.0, 1.0]);
        sim.add_zeeman([1e3, 0.0, 0.0]);

        let m = [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0]];
        let mut h = [[9.9; 3]; 2];
        sim.compute_field(0.0, &m, &mut h);

        assert!((h[0][0] - 1e3).abs() < 1e-9);
        let hz = 2.0 * 1e4 / (MU0 * 1e5);
        assert!((h[0][2] - hz).abs() < 1e-9 * hz);
        // the unweighted site gets exactly zero field
        assert_eq!(h[1], [0.0; 3]);
    }

    #[test]
    fn parallel_field_pass_matches_serial() {
        let mesh = Mesh::new(64, 1, 1, 1.0, 1.0, 1.0, 1e-9);
        let mut sim = FieldSet::new(&mesh, 8e5);
        sim.add_uniaxial_anisotropy(5e4, [1.0, 0.0, 0.0]);
        sim.add_zeeman([0.0, 2e4, 0.0]);

        let m: Vec<[f64; 3]> = (0..64)
            .map(|i| {
                let a = 0.1 * i as f64;
                [a.cos(), a.sin(), 0.0]
            })
            .collect();

        let mut h_serial = vec![[0.0; 3]; 64];
        sim.compute_field(0.0, &m, &mut h_serial);

        sim.parallel = true;
        let mut h_par = vec![[0.0; 3]; 64];
        sim.compute_field(0.0, &m, &mut h_par);

        assert_eq!(h_serial, h_par);
    }
}
