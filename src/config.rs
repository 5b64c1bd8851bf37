// src/config.rs

use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::Path;

use crate::mesh::Mesh;
use crate::string_method::StringSettings;

#[derive(Serialize)]
pub struct RunConfig {
    pub geometry: GeometryConfig,
    pub material: MaterialConfig,
    pub relaxation: RelaxationConfig,
    pub run: RunInfo,
}

#[derive(Serialize)]
pub struct GeometryConfig {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub unit_length: f64,
}

impl From<&Mesh> for GeometryConfig {
    fn from(mesh: &Mesh) -> Self {
        Self {
            nx: mesh.nx,
            ny: mesh.ny,
            nz: mesh.nz,
            dx: mesh.dx,
            dy: mesh.dy,
            dz: mesh.dz,
            unit_length: mesh.unit_length,
        }
    }
}

#[derive(Serialize)]
pub struct MaterialConfig {
    pub ms: f64,
    pub ku1: f64,
    pub easy_axis: [f64; 3],
    pub h_ext: Option<[f64; 3]>,
}

#[derive(Serialize)]
pub struct RelaxationConfig {
    pub integrator: String,
    pub stepsize: f64,
    pub mass: f64,
    pub dt: f64,
    pub stopping_dydt: f64,
    pub max_iterations: usize,
    pub resample_every: usize,
}

impl RelaxationConfig {
    pub fn from_settings(settings: &StringSettings) -> Self {
        Self {
            integrator: "verlet".to_string(),
            stepsize: settings.stepsize,
            mass: settings.mass,
            dt: settings.dt,
            stopping_dydt: settings.stopping_dydt,
            max_iterations: settings.max_iterations,
            resample_every: settings.resample_every,
        }
    }
}

#[derive(Serialize)]
pub struct RunInfo {
    pub binary: String,
    pub run_id: String,
}

impl RunConfig {
    pub fn write_to_dir(&self, out_dir: &Path) -> io::Result<()> {
        let path = out_dir.join("config.json");
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
