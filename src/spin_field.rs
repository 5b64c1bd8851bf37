// src/spin_field.rs

use crate::mesh::Mesh;
use crate::vec3::normalize;

/// Spin configuration over a mesh: one unit vector per site.
/// Sites with zero saturation carry the zero vector and are ignored by
/// the unit-norm constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinField {
    pub data: Vec<[f64; 3]>,
}

impl SpinField {
    /// Create a field with every site set to the (normalised) direction `dir`.
    pub fn uniform(n: usize, dir: [f64; 3]) -> Self {
        let v = normalize(dir);
        Self { data: vec![v; n] }
    }

    /// Create a field from a per-site function of the site-centre position
    /// (lattice units). Each returned vector is normalised.
    pub fn from_fn<F>(mesh: &Mesh, f: F) -> Self
    where
        F: Fn([f64; 3]) -> [f64; 3],
    {
        let n = mesh.n_sites();
        let mut data = Vec::with_capacity(n);
        for idx in 0..n {
            data.push(normalize(f(mesh.site_center(idx))));
        }
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Renormalise every site vector in place. Zero vectors stay zero.
    pub fn normalize_all(&mut self) {
        normalize_sites(&mut self.data);
    }

    /// Zero out every site whose saturation weight is exactly zero.
    pub fn apply_saturation_mask(&mut self, ms: &[f64]) {
        assert_eq!(self.data.len(), ms.len());
        for (v, &w) in self.data.iter_mut().zip(ms.iter()) {
            if w == 0.0 {
                *v = [0.0; 3];
            }
        }
    }
}

/// Renormalise a slice of site vectors in place, leaving zero vectors alone.
pub fn normalize_sites(sites: &mut [[f64; 3]]) {
    for v in sites.iter_mut() {
        *v = normalize(*v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;

    #[test]
    fn from_fn_normalises_per_site() {
        let mesh = Mesh::new(2, 1, 1, 1.0, 1.0, 1.0, 1e-9);
        let m = SpinField::from_fn(&mesh, |pos| if pos[0] < 1.0 { [2.0, 0.0, 0.0] } else { [0.0, 0.0, -3.0] });
        assert_eq!(m.data[0], [1.0, 0.0, 0.0]);
        assert_eq!(m.data[1], [0.0, 0.0, -1.0]);
    }

    #[test]
    fn saturation_mask_zeroes_unweighted_sites() {
        let mut m = SpinField::uniform(3, [0.0, 0.0, 1.0]);
        m.apply_saturation_mask(&[1.0, 0.0, 1.0]);
        assert_eq!(m.data[1], [0.0; 3]);
        assert_eq!(m.data[0], [0.0, 0.0, 1.0]);
    }
}
