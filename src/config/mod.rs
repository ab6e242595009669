//! Configuration management for RAS CI calculations
//!
//! This module handles configuration structures, defaults, and validation
//! for the determinant space, the model Hamiltonian and the Davidson solver.

mod args;
#[cfg(test)]
mod tests;

pub use args::Args;

use crate::space_impl::{RasWindows, SpaceParams};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub space: SpaceConfig,
    #[serde(default)]
    pub model: ModelParams,
    pub solver: Option<SolverParams>,
    pub parallel: Option<ParallelParams>,
    pub archive: Option<String>,
    pub restart: Option<String>,
}

/// Orbital windows, electron counts and excitation bounds
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpaceConfig {
    pub ras: RasWindows,
    pub nelea: usize,
    pub neleb: usize,
    pub max_holes: Option<usize>,
    pub max_particles: Option<usize>,
}

impl SpaceConfig {
    pub fn params(&self) -> SpaceParams {
        SpaceParams::new(
            self.ras,
            self.nelea,
            self.neleb,
            self.max_holes.unwrap_or(0),
            self.max_particles.unwrap_or(0),
        )
    }
}

/// One-body hopping plus on-site interaction.
///
/// Without `one_body` the model is a nearest-neighbour chain over all
/// orbitals of the space.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelParams {
    pub hopping: Option<f64>,
    pub periodic: Option<bool>,
    pub interaction: Option<f64>,
    pub one_body: Option<Vec<Vec<f64>>>,
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams {
            hopping: Some(1.0),
            periodic: Some(false),
            interaction: Some(0.0),
            one_body: None,
        }
    }
}

impl ModelParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.hopping.is_none() {
            self.hopping = defaults.hopping;
        }
        if self.periodic.is_none() {
            self.periodic = defaults.periodic;
        }
        if self.interaction.is_none() {
            self.interaction = defaults.interaction;
        }
        self
    }
}

/// Davidson solver parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SolverParams {
    pub nstate: Option<usize>,
    pub max_iter: Option<usize>,
    pub max_subspace: Option<usize>,
    pub convergence_threshold: Option<f64>,
    pub spin_adapt: Option<bool>,
    pub spin_threshold: Option<f64>,
    pub print_threshold: Option<f64>,
}

impl Default for SolverParams {
    fn default() -> Self {
        SolverParams {
            nstate: Some(1),
            max_iter: Some(100),
            max_subspace: Some(20),
            convergence_threshold: Some(1e-8),
            spin_adapt: Some(true),
            spin_threshold: Some(1e-8),
            print_threshold: Some(0.05),
        }
    }
}

impl SolverParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.nstate.is_none() {
            self.nstate = defaults.nstate;
        }
        if self.max_iter.is_none() {
            self.max_iter = defaults.max_iter;
        }
        if self.max_subspace.is_none() {
            self.max_subspace = defaults.max_subspace;
        }
        if self.convergence_threshold.is_none() {
            self.convergence_threshold = defaults.convergence_threshold;
        }
        if self.spin_adapt.is_none() {
            self.spin_adapt = defaults.spin_adapt;
        }
        if self.spin_threshold.is_none() {
            self.spin_threshold = defaults.spin_threshold;
        }
        if self.print_threshold.is_none() {
            self.print_threshold = defaults.print_threshold;
        }
        self
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ParallelParams {
    pub ranks: Option<usize>,
}

impl Default for ParallelParams {
    fn default() -> Self {
        ParallelParams { ranks: Some(1) }
    }
}

impl Config {
    /// Apply defaults to all configuration sections
    pub fn with_defaults(mut self) -> Self {
        self.model = self.model.with_defaults();
        self.solver = Some(self.solver.take().unwrap_or_default().with_defaults());
        if self.parallel.as_ref().and_then(|p| p.ranks).is_none() {
            self.parallel = Some(ParallelParams::default());
        }
        self
    }

    fn solver_params(&self) -> SolverParams {
        self.solver.clone().unwrap_or_default().with_defaults()
    }

    pub fn nstate(&self) -> usize {
        self.solver_params().nstate.unwrap_or(1)
    }

    pub fn max_iter(&self) -> usize {
        self.solver_params().max_iter.unwrap_or(100)
    }

    pub fn max_subspace(&self) -> usize {
        self.solver_params().max_subspace.unwrap_or(20)
    }

    pub fn convergence_threshold(&self) -> f64 {
        self.solver_params().convergence_threshold.unwrap_or(1e-8)
    }

    pub fn spin_adapt(&self) -> bool {
        self.solver_params().spin_adapt.unwrap_or(true)
    }

    pub fn spin_threshold(&self) -> f64 {
        self.solver_params().spin_threshold.unwrap_or(1e-8)
    }

    pub fn print_threshold(&self) -> f64 {
        self.solver_params().print_threshold.unwrap_or(0.05)
    }

    /// Number of ranks of the in-process world
    pub fn ranks(&self) -> usize {
        self.parallel.as_ref().and_then(|p| p.ranks).unwrap_or(1)
    }
}
