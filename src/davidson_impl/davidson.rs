//! Subspace diagonalizer for the lowest eigenpairs of a Hermitian operator

use nalgebra::{ComplexField, DMatrix, DVector};
use tracing::debug;

use crate::civec_impl::{Amplitude, CiVectorOps};

/// Davidson subspace: orthonormal trial vectors, their sigma vectors and the
/// projected matrix `<b_i|H|b_j>`.
///
/// When adding vectors would grow the subspace beyond `max_subspace`, it is
/// collapsed onto the current Ritz vectors first.
pub struct DavidsonDiag<V: CiVectorOps> {
    nstate: usize,
    max_subspace: usize,
    basis: Vec<V>,
    sigma: Vec<V>,
    matrix: DMatrix<V::Elem>,
    eigenvalues: Vec<f64>,
    /// Subspace coefficients of the Ritz vectors, one column per state
    vectors: DMatrix<V::Elem>,
}

impl<V: CiVectorOps> DavidsonDiag<V> {
    pub fn new(nstate: usize, max_subspace: usize) -> Self {
        assert!(nstate > 0, "Davidson needs at least one state");
        assert!(
            max_subspace >= 2 * nstate,
            "subspace of {} vectors cannot hold {} states and their corrections",
            max_subspace,
            nstate
        );
        DavidsonDiag {
            nstate,
            max_subspace,
            basis: Vec::new(),
            sigma: Vec::new(),
            matrix: DMatrix::zeros(0, 0),
            eigenvalues: Vec::new(),
            vectors: DMatrix::zeros(0, 0),
        }
    }

    pub fn nstate(&self) -> usize {
        self.nstate
    }

    /// Number of trial vectors currently held
    pub fn nvec(&self) -> usize {
        self.basis.len()
    }

    pub fn basis(&self) -> &[V] {
        &self.basis
    }

    /// Ritz values of the last `compute`
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Adds trial vectors `cc` (orthonormal to each other and to the
    /// subspace) with their sigma vectors and returns the lowest Ritz values.
    pub fn compute(&mut self, cc: Vec<V>, sigma: Vec<V>) -> Vec<f64> {
        assert_eq!(
            cc.len(),
            sigma.len(),
            "every trial vector needs its sigma vector"
        );
        if !self.basis.is_empty() && self.basis.len() + cc.len() > self.max_subspace {
            self.collapse();
        }

        let old = self.basis.len();
        self.basis.extend(cc);
        self.sigma.extend(sigma);
        let n = self.basis.len();

        let mut matrix = DMatrix::zeros(n, n);
        matrix.view_mut((0, 0), (old, old)).copy_from(&self.matrix);
        for j in old..n {
            for i in 0..=j {
                let element = self.basis[i].dot_product(&self.sigma[j]);
                if i == j {
                    matrix[(i, i)] = <V::Elem as Amplitude>::lift(element.real());
                } else {
                    matrix[(i, j)] = element;
                    matrix[(j, i)] = element.conjugate();
                }
            }
        }
        self.matrix = matrix;
        self.diagonalize()
    }

    fn diagonalize(&mut self) -> Vec<f64> {
        let n = self.matrix.nrows();
        let eigen = self.matrix.clone().symmetric_eigen();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

        let nroot = self.nstate.min(n);
        self.eigenvalues = order[..nroot]
            .iter()
            .map(|&k| eigen.eigenvalues[k])
            .collect();
        self.vectors = DMatrix::from_fn(n, nroot, |i, k| eigen.eigenvectors[(i, order[k])]);
        self.eigenvalues.clone()
    }

    /// `sum_j c_jk v_j` for Ritz vector `k`
    fn combine(&self, vs: &[V], k: usize) -> V {
        let mut out = vs[0].clone_empty();
        for (j, v) in vs.iter().enumerate() {
            out.ax_plus_y(self.vectors[(j, k)], v);
        }
        out
    }

    /// Replaces the subspace with the current Ritz vectors
    fn collapse(&mut self) {
        let nroot = self.eigenvalues.len();
        debug!(
            "Collapsing Davidson subspace from {} to {} vectors",
            self.basis.len(),
            nroot
        );
        let basis: Vec<V> = (0..nroot).map(|k| self.combine(&self.basis, k)).collect();
        let sigma: Vec<V> = (0..nroot).map(|k| self.combine(&self.sigma, k)).collect();
        let diagonal = DVector::from_iterator(
            nroot,
            self.eigenvalues
                .iter()
                .map(|&e| <V::Elem as Amplitude>::lift(e)),
        );
        self.matrix = DMatrix::from_diagonal(&diagonal);
        self.vectors = DMatrix::identity(nroot, nroot);
        self.basis = basis;
        self.sigma = sigma;
    }

    /// Residual vectors `H|x_k> - E_k|x_k>` of the current Ritz pairs
    pub fn residual(&self) -> Vec<V> {
        self.eigenvalues
            .iter()
            .enumerate()
            .map(|(k, &energy)| {
                let shift = <V::Elem as Amplitude>::lift(-energy);
                let mut r = self.basis[0].clone_empty();
                for (j, (b, s)) in self.basis.iter().zip(&self.sigma).enumerate() {
                    let c = self.vectors[(j, k)];
                    r.ax_plus_y(c, s);
                    r.ax_plus_y(c * shift, b);
                }
                r
            })
            .collect()
    }

    /// Current Ritz vectors
    pub fn civec(&self) -> Vec<V> {
        (0..self.eigenvalues.len())
            .map(|k| self.combine(&self.basis, k))
            .collect()
    }

    /// Orthonormalizes `v` against the subspace; returns its norm before
    /// normalization
    pub fn orthog(&self, v: &mut V) -> f64 {
        v.orthog(self.basis.iter())
    }
}
