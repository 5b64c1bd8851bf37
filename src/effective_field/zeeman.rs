// src/effective_field/zeeman.rs

use crate::effective_field::MU0;

use rayon::prelude::*;

/// Uniform applied field H_ext (A/m).
pub struct Zeeman {
    pub h_ext: [f64; 3],
}

impl Zeeman {
    pub fn new(h_ext: [f64; 3]) -> Self {
        Self { h_ext }
    }

    /// Add the applied field to `h_eff` on every site with non-zero saturation.
    pub fn add_field(&self, ms: &[f64], h_eff: &mut [[f64; 3]], parallel: bool) {
        let h_ext = self.h_ext;

        if parallel {
            h_eff.par_iter_mut().zip(ms.par_iter()).for_each(|(h, &msi)| {
                if msi != 0.0 {
                    h[0] += h_ext[0];
                    h[1] += h_ext[1];
                    h[2] += h_ext[2];
                }
            });
        } else {
            for (h, &msi) in h_eff.iter_mut().zip(ms.iter()) {
                if msi != 0.0 {
                    h[0] += h_ext[0];
                    h[1] += h_ext[1];
                    h[2] += h_ext[2];
                }
            }
        }
    }

    /// Total Zeeman energy (J): -mu0 Ms (m·H) per weighted site.
    pub fn energy(&self, m: &[[f64; 3]], ms: &[f64], cell_volume: f64) -> f64 {
        let h_ext = self.h_ext;
        let mut e = 0.0;
        for (mi, &msi) in m.iter().zip(ms.iter()) {
            if msi == 0.0 {
                continue;
            }
            e -= MU0 * msi * (mi[0] * h_ext[0] + mi[1] * h_ext[1] + mi[2] * h_ext[2]);
        }
        e * cell_volume
    }
}
