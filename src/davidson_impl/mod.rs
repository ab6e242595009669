//! Davidson eigensolver for CI vectors
//!
//! The solver is generic over the vector representation, so the same driver
//! runs on [`crate::civec_impl::CiVector`] and on
//! [`crate::civec_impl::DistCiVector`]. Sigma vectors come from a
//! [`crate::hamiltonian_impl::SigmaBuilder`].
//!
//! # Usage
//!
//! ```rust
//! use rasci::{generate_guess, CiSolver, CiVector, DeterminantSpace, HubbardModel, SigmaBuilder, SpaceParams};
//! use std::sync::Arc;
//!
//! let space = Arc::new(DeterminantSpace::new(SpaceParams::new([0, 2, 0], 1, 1, 0, 0)));
//! let model = HubbardModel::chain(2, 1.0, false, 4.0);
//! let denom = model.denominator(&CiVector::<f64>::zeros(space));
//! let guess = generate_guess(&denom, 1, true).unwrap();
//!
//! let solution = CiSolver::new(1).solve_spin_adapted(&model, guess).unwrap();
//! assert!((solution.energies[0] - (2.0 - 8.0_f64.sqrt())).abs() < 1e-8);
//! ```

mod davidson;
mod guess;
mod solver;
#[cfg(test)]
mod tests;

pub use davidson::DavidsonDiag;
pub use guess::generate_guess;
pub use solver::{CiSolution, CiSolver};
