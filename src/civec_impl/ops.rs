//! Algebra shared by local and distributed CI vectors

use nalgebra::ComplexField;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::info;

use super::amplitude::Amplitude;
use crate::space_impl::{Action, BlockInfo, BlockKey, DeterminantSpace, Spin};

/// Squared norms below this are treated as an exactly zero vector
pub const ZERO_NORM_SQUARED: f64 = 1.0e-60;

/// One determinant with its amplitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Determinant<T> {
    pub abits: u64,
    pub bbits: u64,
    pub value: T,
}

/// Linear algebra and excitation operators of a CI vector.
///
/// Binary operations require compatible spaces (same electron and orbital
/// counts); blocks are matched by class key, so spaces with different hole /
/// particle bounds can be combined and blocks missing on either side are
/// skipped.
pub trait CiVectorOps: Clone + Send + Sync + Sized {
    type Elem: Amplitude;

    fn space(&self) -> &Arc<DeterminantSpace>;

    /// Zero vector over `space`, placed like `self` (same ranks)
    fn zeros_in(&self, space: Arc<DeterminantSpace>) -> Self;

    /// Zero vector over the same space
    fn clone_empty(&self) -> Self {
        self.zeros_in(self.space().clone())
    }

    /// Independent vector with the same space and amplitudes
    fn copy(&self) -> Self {
        self.clone()
    }

    fn zero(&mut self);

    /// Number of determinants of the whole (unsharded) vector
    fn global_size(&self) -> usize;

    /// `<self|other>`
    fn dot_product(&self, other: &Self) -> Self::Elem;

    fn norm(&self) -> f64 {
        self.dot_product(self).real().sqrt()
    }

    fn variance(&self) -> f64 {
        self.dot_product(self).real() / self.global_size() as f64
    }

    fn rms(&self) -> f64 {
        self.variance().sqrt()
    }

    fn scale(&mut self, a: Self::Elem);

    /// `self += a * x`
    fn ax_plus_y(&mut self, a: Self::Elem, x: &Self);

    /// Removes the component along `other`
    fn project_out(&mut self, other: &Self) {
        let overlap = other.dot_product(self);
        self.ax_plus_y(-overlap, other);
    }

    /// Scales to unit norm and returns the norm before scaling.
    ///
    /// A vector with `norm^2 < 1e-60` is left untouched.
    fn normalize(&mut self) -> f64 {
        let norm2 = self.dot_product(self).real();
        let norm = norm2.sqrt();
        if norm2 >= ZERO_NORM_SQUARED {
            self.scale(<Self::Elem as Amplitude>::lift(1.0 / norm));
        }
        norm
    }

    /// Projects out every vector of `others` in turn, then normalizes.
    /// Returns the norm before normalization.
    fn orthog<'a, I>(&mut self, others: I) -> f64
    where
        I: IntoIterator<Item = &'a Self>,
        Self: 'a,
    {
        for other in others {
            self.project_out(other);
        }
        self.normalize()
    }

    /// Creation / annihilation of `orbital` with the given spin.
    ///
    /// The result lives in a new space with one more / one less electron of
    /// that spin and hole / particle bounds shifted accordingly.
    fn apply(&self, orbital: usize, action: Action, spin: Spin) -> Self;

    /// Same amplitudes over the alpha / beta swapped space
    fn transpose(&self) -> Self;

    /// Sets every amplitude to `f(alpha bits, beta bits)`
    fn fill_with<F>(&mut self, f: F)
    where
        F: Fn(u64, u64) -> Self::Elem + Sync;

    /// `self[i] = f(self[i], a[i], b[i])` elementwise; all three vectors must
    /// share the space
    fn zip_map<F>(&mut self, a: &Self, b: &Self, f: F)
    where
        F: Fn(Self::Elem, Self::Elem, Self::Elem) -> Self::Elem + Sync;

    /// Sets one amplitude; the determinant must belong to the space
    fn set_determinant(&mut self, abits: u64, bbits: u64, value: Self::Elem);

    /// The `n` determinants with the lowest real amplitude
    fn lowest_elements(&self, n: usize) -> Vec<Determinant<Self::Elem>>;

    /// Amplitudes with `|c| >= threshold`, largest first
    fn significant_elements(&self, threshold: f64) -> Vec<Determinant<Self::Elem>>;

    /// One line per significant determinant: occupations and amplitude
    fn format_amplitudes(&self, threshold: f64) -> Vec<String> {
        let space = self.space();
        self.significant_elements(threshold)
            .into_iter()
            .map(|d| {
                format!(
                    "       {}  {:>15.10}",
                    space.format_determinant(d.abits, d.bbits),
                    d.value
                )
            })
            .collect()
    }

    fn print(&self, threshold: f64) {
        for line in self.format_amplitudes(threshold) {
            info!("{}", line);
        }
    }
}

/// Ordering by magnitude (descending), ties broken by bit patterns
pub(crate) fn by_magnitude<T: Amplitude>(a: &Determinant<T>, b: &Determinant<T>) -> Ordering {
    b.value
        .modulus()
        .total_cmp(&a.value.modulus())
        .then_with(|| (a.abits, a.bbits).cmp(&(b.abits, b.bbits)))
}

/// Ordering by real part (ascending), ties broken by bit patterns
pub(crate) fn by_value<T: Amplitude>(a: &Determinant<T>, b: &Determinant<T>) -> Ordering {
    a.value
        .real()
        .total_cmp(&b.value.real())
        .then_with(|| (a.abits, a.bbits).cmp(&(b.abits, b.bbits)))
}

/// Space reached from `space` by one operator
pub(crate) fn target_space(
    space: &DeterminantSpace,
    orbital: usize,
    action: Action,
    spin: Spin,
) -> Arc<DeterminantSpace> {
    Arc::new(DeterminantSpace::new(
        space.params().after_operator(orbital, action, spin),
    ))
}

/// Route of one source block through an operator
pub(crate) struct BlockRoute<'a> {
    pub source: &'a BlockInfo,
    pub target: &'a BlockInfo,
    /// Per string of the acted-on spin: target string and phase
    pub map: Vec<Option<(usize, f64)>>,
}

/// Pairs every block of `space` with its destination block in `dest`.
///
/// Blocks whose destination class is negative or absent from `dest` are
/// dropped. Phases include the `(-1)^nelea` of beta operators.
pub(crate) fn block_routes<'a>(
    space: &'a DeterminantSpace,
    dest: &'a DeterminantSpace,
    orbital: usize,
    action: Action,
    spin: Spin,
) -> Vec<BlockRoute<'a>> {
    let window = space.params().ras_window(orbital);
    let beta_phase = if space.nelea() % 2 == 1 { -1.0 } else { 1.0 };

    space
        .blocks()
        .filter_map(|source| {
            let key = source.key();
            let tkey = match spin {
                Spin::Alpha => BlockKey::new(key.alpha.after_operator(window, action)?, key.beta),
                Spin::Beta => BlockKey::new(key.alpha, key.beta.after_operator(window, action)?),
            };
            let target = dest.block_info(tkey)?;
            let (from, to, phase) = match spin {
                Spin::Alpha => (
                    space.stringsa().class(source.alpha_class()),
                    dest.stringsa().class(target.alpha_class()),
                    1.0,
                ),
                Spin::Beta => (
                    space.stringsb().class(source.beta_class()),
                    dest.stringsb().class(target.beta_class()),
                    beta_phase,
                ),
            };
            let map = from
                .operator_map(orbital, action, to)
                .into_iter()
                .map(|entry| entry.map(|(i, sign)| (i, sign * phase)))
                .collect();
            Some(BlockRoute {
                source,
                target,
                map,
            })
        })
        .collect()
}
