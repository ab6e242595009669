use super::*;
use crate::civec_impl::{CiVector, CiVectorOps, DistCiVector};
use crate::comm_impl::run_ranks;
use crate::space_impl::{DeterminantSpace, SpaceParams};
use approx::*;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn dimer_space() -> Arc<DeterminantSpace> {
    Arc::new(DeterminantSpace::new(SpaceParams::new([0, 2, 0], 1, 1, 0, 0)))
}

fn random_vector(space: Arc<DeterminantSpace>, seed: u64) -> CiVector<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..space.size()).map(|_| rng.gen_range(-1.0..1.0)).collect();
    CiVector::from_data(space, data)
}

/// Dense matrix of the model over a (small) space, one sigma per column
fn dense_hamiltonian(model: &HubbardModel, space: Arc<DeterminantSpace>) -> DMatrix<f64> {
    let n = space.size();
    let mut matrix = DMatrix::zeros(n, n);
    for j in 0..n {
        let mut unit = vec![0.0; n];
        unit[j] = 1.0;
        let cc = CiVector::from_data(space.clone(), unit);
        let sigma = model.form_sigma(&[cc], &[false]).remove(0);
        for (i, value) in sigma.data().iter().enumerate() {
            matrix[(i, j)] = *value;
        }
    }
    matrix
}

#[test]
fn test_chain_one_body() {
    let open = HubbardModel::chain(4, 1.0, false, 0.0);
    assert_eq!(open.one_body()[(0, 1)], -1.0);
    assert_eq!(open.one_body()[(0, 3)], 0.0);

    let ring = HubbardModel::chain(4, 1.0, true, 0.0);
    assert_eq!(ring.one_body()[(0, 3)], -1.0);

    // the dimer bond is not counted twice
    let dimer = HubbardModel::chain(2, 1.0, true, 4.0);
    assert_eq!(dimer.one_body()[(0, 1)], -1.0);

    let golden = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let energies = open.orbital_energies();
    assert_relative_eq!(energies[0], -golden, epsilon = 1e-12);
    assert_relative_eq!(energies[3], golden, epsilon = 1e-12);
}

#[test]
fn test_denominator() {
    let model = HubbardModel::chain(2, 1.0, false, 4.0);
    let template = CiVector::<f64>::zeros(dimer_space());
    let denom = model.denominator(&template);
    assert_eq!(denom.element(0b01, 0b01), Some(4.0));
    assert_eq!(denom.element(0b10, 0b10), Some(4.0));
    assert_eq!(denom.element(0b01, 0b10), Some(0.0));

    let onsite = HubbardModel::new(DMatrix::from_diagonal_element(2, 2, 0.5), 0.0);
    let denom = onsite.denominator(&template);
    assert_eq!(denom.element(0b01, 0b10), Some(1.0));
}

#[test]
fn test_dimer_spectrum() {
    let model = HubbardModel::chain(2, 1.0, false, 4.0);
    let matrix = dense_hamiltonian(&model, dimer_space());
    assert_relative_eq!(matrix.clone(), matrix.transpose(), epsilon = 1e-14);

    let mut energies: Vec<f64> = matrix.symmetric_eigen().eigenvalues.iter().copied().collect();
    energies.sort_by(f64::total_cmp);
    assert_relative_eq!(energies[0], 2.0 - 2.0 * 2.0_f64.sqrt(), epsilon = 1e-12);
    // triplet Sz = 0 component
    assert_abs_diff_eq!(energies[1], 0.0, epsilon = 1e-12);
}

#[test]
fn test_sigma_is_hermitian_in_ras_space() {
    let space = Arc::new(DeterminantSpace::new(SpaceParams::new([1, 3, 1], 2, 2, 1, 1)));
    let model = HubbardModel::chain(5, 1.0, true, 2.5);
    let a = random_vector(space.clone(), 21);
    let b = random_vector(space, 22);
    let sigma = model.form_sigma(&[a.clone(), b.clone()], &[false, false]);
    assert_relative_eq!(
        a.dot_product(&sigma[1]),
        sigma[0].dot_product(&b),
        epsilon = 1e-12
    );
}

#[test]
fn test_converged_states_are_skipped() {
    let model = HubbardModel::chain(2, 1.0, false, 4.0);
    let cc = random_vector(dimer_space(), 23);
    let sigma = model.form_sigma(&[cc.clone(), cc], &[true, false]);
    assert_eq!(sigma[0].norm(), 0.0);
    assert!(sigma[1].norm() > 0.0);
}

#[test]
fn test_distributed_sigma() {
    let space = Arc::new(DeterminantSpace::new(SpaceParams::new([1, 3, 1], 2, 2, 1, 1)));
    let model = HubbardModel::chain(5, 1.0, false, 3.0);
    let local = random_vector(space.clone(), 24);
    let expected = model.form_sigma(&[local.clone()], &[false]).remove(0);

    run_ranks(3, |comm| {
        let dist = DistCiVector::from_local(&local, comm);
        let sigma = model.form_sigma(&[dist], &[false]).remove(0).to_local();
        for (x, y) in sigma.data().iter().zip(expected.data()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
        assert_eq!(sigma.space(), &space);
    })
    .unwrap();
}
