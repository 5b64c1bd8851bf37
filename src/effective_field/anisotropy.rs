// src/effective_field/anisotropy.rs

use crate::effective_field::MU0;
use crate::vec3::normalize;

use rayon::prelude::*;

/// Uniaxial anisotropy with energy density w = K_u [1 - (m·u)^2].
///
/// The corresponding effective field is
///   H_ani = (2 K_u / (mu0 Ms)) (m·u) u   [A/m]
/// with the per-site saturation Ms; sites with Ms = 0 get no field.
pub struct UniaxialAnisotropy {
    pub ku: f64,
    pub axis: [f64; 3],
}

impl UniaxialAnisotropy {
    pub fn new(ku: f64, axis: [f64; 3]) -> Self {
        Self { ku, axis: normalize(axis) }
    }

    #[inline]
    fn site_field(&self, m: [f64; 3], ms: f64) -> [f64; 3] {
        if ms == 0.0 {
            return [0.0; 3];
        }
        let u = self.axis;
        let coeff = 2.0 * self.ku / (MU0 * ms);
        let mdotu = m[0] * u[0] + m[1] * u[1] + m[2] * u[2];
        [coeff * mdotu * u[0], coeff * mdotu * u[1], coeff * mdotu * u[2]]
    }

    /// Add the anisotropy field to `h_eff` (A/m).
    pub fn add_field(&self, m: &[[f64; 3]], ms: &[f64], h_eff: &mut [[f64; 3]], parallel: bool) {
        if self.ku == 0.0 {
            return;
        }

        if parallel {
            h_eff
                .par_iter_mut()
                .zip(m.par_iter().zip(ms.par_iter()))
                .for_each(|(h, (mi, &msi))| {
                    let f = self.site_field(*mi, msi);
                    h[0] += f[0];
                    h[1] += f[1];
                    h[2] += f[2];
                });
        } else {
            for (h, (mi, &msi)) in h_eff.iter_mut().zip(m.iter().zip(ms.iter())) {
                let f = self.site_field(*mi, msi);
                h[0] += f[0];
                h[1] += f[1];
                h[2] += f[2];
            }
        }
    }

    /// Total anisotropy energy (J) over sites with non-zero saturation.
    pub fn energy(&self, m: &[[f64; 3]], ms: &[f64], cell_volume: f64) -> f64 {
        let u = self.axis;
        let mut e = 0.0;
        for (mi, &msi) in m.iter().zip(ms.iter()) {
            if msi == 0.0 {
                continue;
            }
            let mdotu = mi[0] * u[0] + mi[1] * u[1] + mi[2] * u[2];
            e += self.ku * (1.0 - mdotu * mdotu);
        }
        e * cell_volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_pulls_toward_easy_axis_and_skips_unweighted_sites() {
        let ani = UniaxialAnisotropy::new(1e5, [1.0, 0.0, 0.0]);
        let m = [[0.8, 0.0, 0.6], [0.8, 0.0, 0.6]];
        let ms = [3.8e5, 0.0];
        let mut h = [[0.0; 3]; 2];
        ani.add_field(&m, &ms, &mut h, false);

        let expected = 2.0 * 1e5 / (MU0 * 3.8e5) * 0.8;
        assert!((h[0][0] - expected).abs() < 1e-6 * expected.abs());
        assert_eq!(h[0][1], 0.0);
        assert_eq!(h[1], [0.0; 3]);
    }

    #[test]
    fn energy_is_zero_on_axis_and_maximal_on_hard_plane() {
        let ani = UniaxialAnisotropy::new(1e5, [1.0, 0.0, 0.0]);
        let ms = [1.0];
        let dv = 2.7e-26;
        let on_axis = ani.energy(&[[1.0, 0.0, 0.0]], &ms, dv);
        let hard = ani.energy(&[[0.0, 0.0, 1.0]], &ms, dv);
        assert!(on_axis.abs() < 1e-40);
        assert!((hard - 1e5 * dv).abs() < 1e-40_f64.max(1e-12 * hard));
    }
}
