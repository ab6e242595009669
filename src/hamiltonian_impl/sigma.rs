//! Sigma builders: the action of a Hamiltonian on CI vectors

use nalgebra::DMatrix;
use tracing::debug;

use crate::civec_impl::{Amplitude, CiVectorOps};
use crate::space_impl::{Action, Spin};

/// Below this magnitude a one-body element is skipped
const ZERO_ELEMENT: f64 = 1.0e-14;

/// Hamiltonian acting on CI vectors of type `V`
pub trait SigmaBuilder<V: CiVectorOps> {
    /// `H|c>` for every vector in `cc`; vectors flagged in `conv` get a zero
    /// sigma vector
    fn form_sigma(&self, cc: &[V], conv: &[bool]) -> Vec<V>;

    /// Diagonal of `H` laid out over the space of `template`
    fn denominator(&self, template: &V) -> V;
}

/// One-body Hamiltonian with an on-site (Hubbard) interaction
///
/// H = sum_{pq,s} h_pq a+(p s) a(q s) + U sum_p n(p alpha) n(p beta)
#[derive(Debug, Clone)]
pub struct HubbardModel {
    one_body: DMatrix<f64>,
    interaction: f64,
}

impl HubbardModel {
    /// Model over an explicit (symmetric) one-body matrix
    pub fn new(one_body: DMatrix<f64>, interaction: f64) -> Self {
        assert!(one_body.is_square(), "one-body matrix must be square");
        HubbardModel {
            one_body,
            interaction,
        }
    }

    /// Nearest-neighbour chain with hopping `-t`
    pub fn chain(nsites: usize, hopping: f64, periodic: bool, interaction: f64) -> Self {
        let mut one_body = DMatrix::zeros(nsites, nsites);
        for i in 1..nsites {
            one_body[(i - 1, i)] = -hopping;
            one_body[(i, i - 1)] = -hopping;
        }
        if periodic && nsites > 2 {
            one_body[(0, nsites - 1)] = -hopping;
            one_body[(nsites - 1, 0)] = -hopping;
        }
        HubbardModel::new(one_body, interaction)
    }

    pub fn norb(&self) -> usize {
        self.one_body.nrows()
    }

    pub fn one_body(&self) -> &DMatrix<f64> {
        &self.one_body
    }

    pub fn interaction(&self) -> f64 {
        self.interaction
    }

    /// Eigenvalues of the one-body matrix in ascending order
    pub fn orbital_energies(&self) -> Vec<f64> {
        let mut energies: Vec<f64> = self
            .one_body
            .clone()
            .symmetric_eigen()
            .eigenvalues
            .iter()
            .copied()
            .collect();
        energies.sort_by(f64::total_cmp);
        energies
    }

    fn sigma_one<V: CiVectorOps>(&self, cc: &V) -> V {
        assert_eq!(
            cc.space().norb(),
            self.norb(),
            "model and determinant space disagree on the number of orbitals"
        );
        let mut sigma = cc.clone_empty();

        for spin in [Spin::Alpha, Spin::Beta] {
            let nele = match spin {
                Spin::Alpha => cc.space().nelea(),
                Spin::Beta => cc.space().neleb(),
            };
            if nele == 0 {
                continue;
            }
            for q in 0..self.norb() {
                let column = self.one_body.column(q);
                if column.iter().all(|h| h.abs() < ZERO_ELEMENT) {
                    continue;
                }
                let annihilated = cc.apply(q, Action::Annihilate, spin);
                for (p, &h) in column.iter().enumerate() {
                    if h.abs() < ZERO_ELEMENT {
                        continue;
                    }
                    let term = annihilated.apply(p, Action::Create, spin);
                    sigma.ax_plus_y(<V::Elem as Amplitude>::lift(h), &term);
                }
            }
        }

        if self.interaction != 0.0 {
            let mut diagonal = cc.clone_empty();
            let u = self.interaction;
            diagonal.fill_with(|a, b| {
                <V::Elem as Amplitude>::lift(u * (a & b).count_ones() as f64)
            });
            sigma.zip_map(&diagonal, cc, |s, d, c| s + d * c);
        }
        sigma
    }
}

impl<V: CiVectorOps> SigmaBuilder<V> for HubbardModel {
    fn form_sigma(&self, cc: &[V], conv: &[bool]) -> Vec<V> {
        assert_eq!(cc.len(), conv.len());
        cc.iter()
            .zip(conv)
            .enumerate()
            .map(|(i, (c, &done))| {
                if done {
                    c.clone_empty()
                } else {
                    debug!("Forming sigma vector for state {}", i);
                    self.sigma_one(c)
                }
            })
            .collect()
    }

    fn denominator(&self, template: &V) -> V {
        let mut denom = template.clone_empty();
        let eps: Vec<f64> = self.one_body.diagonal().iter().copied().collect();
        let u = self.interaction;
        denom.fill_with(|a, b| {
            let one_body: f64 = eps
                .iter()
                .enumerate()
                .map(|(p, e)| e * (((a >> p) & 1) + ((b >> p) & 1)) as f64)
                .sum();
            <V::Elem as Amplitude>::lift(one_body + u * (a & b).count_ones() as f64)
        });
        denom
    }
}
