//! Spin operators, available for real amplitudes only

use color_eyre::eyre::{bail, Result};
use std::sync::Arc;
use tracing::debug;

use super::dist::DistCiVector;
use super::local::CiVector;
use super::ops::CiVectorOps;
use crate::space_impl::{Action, DeterminantSpace, Spin};

/// S+, S- and S^2 built from single-orbital operators.
///
/// Determinants are ordered with all alpha operators to the left of the beta
/// ones, so S+ = sum_p a+(p alpha) a(p beta) and
/// S^2 = S- S+ + Sz (Sz + 1).
pub trait SpinOperators: CiVectorOps<Elem = f64> {
    /// S+ |c> over `target`, which must have one more alpha and one less
    /// beta electron
    fn spin_raise_into(&self, target: Arc<DeterminantSpace>) -> Self {
        let mut out = self.zeros_in(target);
        for p in 0..self.space().norb() {
            let term = self
                .apply(p, Action::Annihilate, Spin::Beta)
                .apply(p, Action::Create, Spin::Alpha);
            out.ax_plus_y(1.0, &term);
        }
        out
    }

    /// S- |c> over `target`, which must have one less alpha and one more
    /// beta electron
    fn spin_lower_into(&self, target: Arc<DeterminantSpace>) -> Self {
        let mut out = self.zeros_in(target);
        for p in 0..self.space().norb() {
            let term = self
                .apply(p, Action::Annihilate, Spin::Alpha)
                .apply(p, Action::Create, Spin::Beta);
            out.ax_plus_y(1.0, &term);
        }
        out
    }

    /// S+ |c> over the space with the same bounds; `None` when no beta
    /// electron can be flipped
    fn spin_raise(&self) -> Option<Self> {
        let params = self.space().params();
        params
            .can_raise_spin()
            .then(|| self.spin_raise_into(Arc::new(DeterminantSpace::new(params.raise_spin()))))
    }

    fn spin_lower(&self) -> Option<Self> {
        let params = self.space().params();
        params
            .can_lower_spin()
            .then(|| self.spin_lower_into(Arc::new(DeterminantSpace::new(params.lower_spin()))))
    }

    /// S^2 |c>
    fn spin(&self) -> Self {
        let sz = self.space().nspin() as f64 / 2.0;
        let mut out = match self.spin_raise() {
            Some(raised) => raised.spin_lower_into(self.space().clone()),
            None => self.clone_empty(),
        };
        out.ax_plus_y(sz * (sz + 1.0), self);
        out
    }

    /// <c|S^2|c>
    fn spin_expectation(&self) -> f64 {
        self.dot_product(&self.spin())
    }

    /// Projects out spin components above S = |Sz| until <S^2> is within
    /// `thresh` of S(S+1).
    ///
    /// Component S' = k/2 is removed by c <- c - 4/(k(k+2)) S^2 c for
    /// k = 2|Sz| + 2, 2|Sz| + 4, ...
    fn spin_decontaminate(&mut self, thresh: f64) -> Result<()> {
        let space = self.space().clone();
        let twice_sz = space.nspin().unsigned_abs() as usize;
        let s = twice_sz as f64 / 2.0;
        let pure = s * (s + 1.0);
        let max_k = space.nelea() + space.neleb();

        let mut k = twice_sz + 2;
        let mut expectation = self.spin_expectation();
        while (expectation - pure).abs() > thresh {
            if k > max_k {
                bail!(
                    "spin decontamination stalled at <S^2> = {:.10} (expected {:.4})",
                    expectation,
                    pure
                );
            }
            let s2 = self.spin();
            self.ax_plus_y(-4.0 / (k * (k + 2)) as f64, &s2);
            self.normalize();
            expectation = self.spin_expectation();
            debug!(
                "Removed S = {:.1} component, <S^2> = {:.10}",
                k as f64 / 2.0,
                expectation
            );
            k += 2;
        }
        Ok(())
    }
}

impl SpinOperators for CiVector<f64> {}

impl SpinOperators for DistCiVector<f64> {}
