//! CI vectors over a RAS determinant space
//!
//! Two representations share one algebraic contract ([`CiVectorOps`]):
//!
//! - [`CiVector`]: every block in one contiguous buffer, replicated on each rank
//! - [`DistCiVector`]: each rank holds an alpha-range shard of every block
//!
//! Spin operators ([`SpinOperators`]) exist only for real amplitudes.
//!
//! # Usage
//!
//! ```rust
//! use rasci::{Action, CiVector, CiVectorOps, DeterminantSpace, SpaceParams, Spin};
//! use std::sync::Arc;
//!
//! let space = Arc::new(DeterminantSpace::new(SpaceParams::new([0, 2, 0], 1, 1, 0, 0)));
//! let mut cc = CiVector::<f64>::zeros(space);
//! cc.set_determinant(0b01, 0b01, 1.0);
//! assert_eq!(cc.norm(), 1.0);
//!
//! let excited = cc.apply(1, Action::Create, Spin::Alpha);
//! assert_eq!(excited.space().nelea(), 2);
//! assert_eq!(excited.element(0b11, 0b01), Some(-1.0));
//! ```

mod amplitude;
mod dist;
mod local;
mod ops;
mod spin;
#[cfg(test)]
mod tests;

pub use amplitude::Amplitude;
pub use dist::{DistCiVector, PendingTranspose, RowFetch};
pub use local::CiVector;
pub use ops::{CiVectorOps, Determinant, ZERO_NORM_SQUARED};
pub use spin::SpinOperators;

pub use num_complex::Complex64;
