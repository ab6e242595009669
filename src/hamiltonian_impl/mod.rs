//! Model Hamiltonians expressed through the CI vector operator algebra
//!
//! [`SigmaBuilder`] is the seam between the Davidson solver and whatever
//! produces sigma vectors. [`HubbardModel`] builds them from single-orbital
//! creation / annihilation operators, so it works unchanged for local and
//! distributed vectors.

mod sigma;
#[cfg(test)]
mod tests;

pub use sigma::{HubbardModel, SigmaBuilder};
