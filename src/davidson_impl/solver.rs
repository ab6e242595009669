//! Davidson iteration driver

use color_eyre::eyre::{bail, Result};
use nalgebra::ComplexField;
use tracing::{debug, info, warn};

use super::davidson::DavidsonDiag;
use crate::civec_impl::{Amplitude, CiVectorOps, SpinOperators};
use crate::hamiltonian_impl::SigmaBuilder;

/// Corrections whose norm drops below this after orthogonalization are
/// linearly dependent on the subspace
const LINEAR_DEPENDENCE: f64 = 1.0e-8;

/// Upper bound of the preconditioner denominator `E - d`
const MAX_DENOMINATOR: f64 = -0.1;

/// Result of a Davidson run
#[derive(Debug, Clone)]
pub struct CiSolution<V> {
    pub energies: Vec<f64>,
    pub vectors: Vec<V>,
    /// Norm of the final residual of every state
    pub errors: Vec<f64>,
    pub converged: Vec<bool>,
    pub iterations: usize,
}

impl<V> CiSolution<V> {
    pub fn all_converged(&self) -> bool {
        self.converged.iter().all(|&c| c)
    }
}

#[derive(Debug, Clone)]
pub struct CiSolver {
    pub nstate: usize,
    pub max_iter: usize,
    pub max_subspace: usize,
    /// Convergence threshold on the residual norm
    pub thresh: f64,
    /// Threshold on |<S^2> - S(S+1)| used by spin decontamination
    pub spin_thresh: f64,
    /// Log iterations (only one rank of a distributed run should)
    pub verbose: bool,
}

impl Default for CiSolver {
    fn default() -> Self {
        CiSolver {
            nstate: 1,
            max_iter: 100,
            max_subspace: 20,
            thresh: 1.0e-8,
            spin_thresh: 1.0e-8,
            verbose: true,
        }
    }
}

impl CiSolver {
    pub fn new(nstate: usize) -> Self {
        CiSolver {
            nstate,
            ..Default::default()
        }
    }

    /// Lowest `nstate` eigenpairs starting from `guess`
    pub fn solve<V, B>(&self, builder: &B, guess: Vec<V>) -> Result<CiSolution<V>>
    where
        V: CiVectorOps,
        B: SigmaBuilder<V>,
    {
        self.iterate(builder, guess, |_| Ok(()))
    }

    /// Like [`CiSolver::solve`], but the guess and every correction vector
    /// are spin-decontaminated to S = |Sz|
    pub fn solve_spin_adapted<V, B>(&self, builder: &B, guess: Vec<V>) -> Result<CiSolution<V>>
    where
        V: SpinOperators,
        B: SigmaBuilder<V>,
    {
        let thresh = self.spin_thresh;
        self.iterate(builder, guess, |v: &mut V| v.spin_decontaminate(thresh))
    }

    fn iterate<V, B, F>(&self, builder: &B, guess: Vec<V>, adapt: F) -> Result<CiSolution<V>>
    where
        V: CiVectorOps,
        B: SigmaBuilder<V>,
        F: Fn(&mut V) -> Result<()>,
    {
        if guess.len() < self.nstate {
            bail!(
                "{} guess vectors for {} states",
                guess.len(),
                self.nstate
            );
        }
        let denom = builder.denominator(&guess[0]);

        let mut trial: Vec<V> = Vec::with_capacity(guess.len());
        for mut g in guess {
            adapt(&mut g)?;
            let norm = g.orthog(trial.iter());
            if norm < LINEAR_DEPENDENCE {
                bail!("guess vectors are linearly dependent");
            }
            trial.push(g);
        }

        if self.verbose {
            info!("===========================================");
            info!("        Davidson diagonalization");
            info!("===========================================");
            info!("Space: {}", trial[0].space());
            info!("Number of states: {}", self.nstate);
            info!("Convergence threshold: {:.2e}", self.thresh);
            info!("  iter state          energy         error");
        }

        let mut davidson = DavidsonDiag::new(self.nstate, self.max_subspace);
        let mut energies = Vec::new();
        let mut errors = vec![f64::INFINITY; self.nstate];
        let mut converged = vec![false; self.nstate];
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            iterations = iter + 1;
            let sigma = builder.form_sigma(&trial, &vec![false; trial.len()]);
            energies = davidson.compute(trial, sigma);
            let residuals = davidson.residual();

            for (i, r) in residuals.iter().enumerate() {
                errors[i] = r.norm();
                converged[i] = errors[i] < self.thresh;
            }
            if self.verbose {
                for (i, energy) in energies.iter().enumerate() {
                    info!(
                        "{:>6} {:>5} {:>17.10} {:>13.2e}{}",
                        iterations,
                        i,
                        energy,
                        errors[i],
                        if converged[i] { " *" } else { "" }
                    );
                }
            }
            if converged.iter().all(|&c| c) {
                break;
            }

            trial = Vec::new();
            for (i, r) in residuals.iter().enumerate() {
                if converged[i] {
                    continue;
                }
                let energy = energies[i];
                let mut t = r.clone_empty();
                t.zip_map(r, &denom, |_, r, d| {
                    let shift = (energy - d.real()).min(MAX_DENOMINATOR);
                    r * <V::Elem as Amplitude>::lift(1.0 / shift)
                });
                t.normalize();
                if let Err(err) = adapt(&mut t) {
                    if self.verbose {
                        warn!("Dropping correction vector of state {}: {}", i, err);
                    }
                    continue;
                }
                let norm = t.orthog(davidson.basis().iter().chain(trial.iter()));
                if norm < LINEAR_DEPENDENCE {
                    debug!("Correction vector of state {} is linearly dependent", i);
                    continue;
                }
                trial.push(t);
            }
            if trial.is_empty() {
                if self.verbose {
                    warn!("No new trial vectors, Davidson subspace stagnated");
                }
                break;
            }
        }

        for (i, done) in converged.iter().enumerate() {
            if !done && self.verbose {
                warn!(
                    "State {} not converged after {} iterations (error {:.2e})",
                    i, iterations, errors[i]
                );
            }
        }

        Ok(CiSolution {
            energies,
            vectors: davidson.civec(),
            errors,
            converged,
            iterations,
        })
    }
}
