// src/mesh.rs

/// Minimal cuboid site lattice.
///
/// The integration and path-relaxation core never walks neighbour
/// relations; all it needs from the mesh is the site count, the cell
/// volume (for energies) and site-centre positions (for per-site
/// initialisation functions). Connectivity stays with the field terms
/// that need it.
///
/// Site centres are reported in lattice units, i.e. `(i + 0.5) * dx`;
/// `unit_length` (metres per lattice unit) only enters the cell volume.
#[derive(Debug, Clone, Copy)]
pub struct Mesh {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub unit_length: f64,
}

impl Mesh {
    pub fn new(nx: usize, ny: usize, nz: usize, dx: f64, dy: f64, dz: f64, unit_length: f64) -> Self {
        Self { nx, ny, nz, dx, dy, dz, unit_length }
    }

    /// Total number of sites.
    pub fn n_sites(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Cell volume in m^3.
    pub fn cell_volume(&self) -> f64 {
        self.dx * self.dy * self.dz * self.unit_length.powi(3)
    }

    /// Convert (i, j, k) indices to a flat site index.
    #[inline]
    pub fn idx(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny && k < self.nz);
        (k * self.ny + j) * self.nx + i
    }

    /// Site-centre position in lattice units for a flat site index.
    pub fn site_center(&self, idx: usize) -> [f64; 3] {
        let i = idx % self.nx;
        let j = (idx / self.nx) % self.ny;
        let k = idx / (self.nx * self.ny);
        [
            (i as f64 + 0.5) * self.dx,
            (j as f64 + 0.5) * self.dy,
            (k as f64 + 0.5) * self.dz,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_is_consistent() {
        let m = Mesh::new(4, 3, 2, 1.0, 1.0, 1.0, 1e-9);
        assert_eq!(m.n_sites(), 24);
        assert_eq!(m.idx(0, 0, 0), 0);
        assert_eq!(m.idx(3, 0, 0), 3);
        assert_eq!(m.idx(0, 1, 0), 4);
        assert_eq!(m.idx(0, 0, 1), 12);
    }

    #[test]
    fn site_centers_sit_at_half_spacings() {
        let m = Mesh::new(3, 1, 1, 3.0, 3.0, 3.0, 1e-9);
        assert_eq!(m.site_center(0), [1.5, 1.5, 1.5]);
        assert_eq!(m.site_center(1), [4.5, 1.5, 1.5]);
        assert_eq!(m.site_center(2), [7.5, 1.5, 1.5]);
    }
}
