//! Initial vectors from the lowest diagonal elements

use color_eyre::eyre::{bail, Result};
use std::collections::HashSet;
use tracing::debug;

use crate::civec_impl::{Amplitude, CiVectorOps, Determinant};

/// Initial candidate pool per requested state
const POOL_PER_STATE: usize = 4;

/// Unit vectors on the `nstate` determinants with the lowest diagonal
/// elements of `denominator`.
///
/// With `spin_adapt`, determinants that differ only by flipping open-shell
/// spins share one (closed, open) pattern and only the lowest of them is
/// used; the solver projects it onto the right spin afterwards. The
/// candidate pool grows four-fold until enough determinants are found or the
/// whole space has been examined.
pub fn generate_guess<V: CiVectorOps>(
    denominator: &V,
    nstate: usize,
    spin_adapt: bool,
) -> Result<Vec<V>> {
    let total = denominator.global_size();
    let mut ndet = nstate * POOL_PER_STATE;
    let picked = loop {
        let candidates = denominator.lowest_elements(ndet.min(total));
        let picked = pick_distinct(&candidates, nstate, spin_adapt);
        if picked.len() == nstate {
            break picked;
        }
        if ndet >= total {
            bail!(
                "only {} distinct guess determinants for {} states in a space of {}",
                picked.len(),
                nstate,
                total
            );
        }
        debug!(
            "{} of {} guess determinants found among {} candidates, retrying",
            picked.len(),
            nstate,
            ndet
        );
        ndet *= POOL_PER_STATE;
    };

    Ok(picked
        .into_iter()
        .map(|d| {
            let mut guess = denominator.clone_empty();
            guess.set_determinant(d.abits, d.bbits, <V::Elem as Amplitude>::lift(1.0));
            guess
        })
        .collect())
}

/// First `nstate` candidates with distinct patterns
fn pick_distinct<T: Copy>(
    candidates: &[Determinant<T>],
    nstate: usize,
    spin_adapt: bool,
) -> Vec<Determinant<T>> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|d| {
            let pattern = if spin_adapt {
                (d.abits & d.bbits, d.abits ^ d.bbits)
            } else {
                (d.abits, d.bbits)
            };
            seen.insert(pattern)
        })
        .take(nstate)
        .copied()
        .collect()
}
