use super::*;
use crate::civec_impl::{CiVector, CiVectorOps, DistCiVector, SpinOperators};
use crate::comm_impl::run_ranks;
use crate::hamiltonian_impl::{HubbardModel, SigmaBuilder};
use crate::space_impl::{DeterminantSpace, SpaceParams};
use approx::*;
use std::sync::Arc;

fn dimer() -> (Arc<DeterminantSpace>, HubbardModel) {
    let space = Arc::new(DeterminantSpace::new(SpaceParams::new([0, 2, 0], 1, 1, 0, 0)));
    (space, HubbardModel::chain(2, 1.0, false, 4.0))
}

fn dimer_ground() -> f64 {
    2.0 - 2.0 * 2.0_f64.sqrt()
}

#[test]
fn test_davidson_full_space() {
    let (space, model) = dimer();
    let mut davidson = DavidsonDiag::new(2, 8);
    for i in 0..space.size() {
        let mut unit = vec![0.0; space.size()];
        unit[i] = 1.0;
        let cc = CiVector::from_data(space.clone(), unit);
        let sigma = model.form_sigma(&[cc.clone()], &[false]);
        davidson.compute(vec![cc], sigma);
    }
    assert_eq!(davidson.nvec(), 4);

    let energies = davidson.eigenvalues();
    assert_relative_eq!(energies[0], dimer_ground(), epsilon = 1e-12);
    assert_abs_diff_eq!(energies[1], 0.0, epsilon = 1e-12);
    for r in davidson.residual() {
        assert_abs_diff_eq!(r.norm(), 0.0, epsilon = 1e-12);
    }
    for x in davidson.civec() {
        assert_relative_eq!(x.norm(), 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_davidson_orthog() {
    let (space, model) = dimer();
    let mut davidson = DavidsonDiag::new(1, 4);
    let mut cc = CiVector::<f64>::zeros(space.clone());
    cc.set_determinant(0b01, 0b10, 1.0);
    let sigma = model.form_sigma(&[cc.clone()], &[false]);
    davidson.compute(vec![cc.clone()], sigma);

    let mut v = CiVector::from_data(space, vec![1.0, 1.0, 1.0, 1.0]);
    let norm = davidson.orthog(&mut v);
    assert!(norm > 0.0);
    assert_abs_diff_eq!(v.dot_product(&cc), 0.0, epsilon = 1e-14);
}

#[test]
fn test_solve_dimer() {
    let (space, model) = dimer();
    let denom = model.denominator(&CiVector::<f64>::zeros(space));
    let guess = generate_guess(&denom, 2, false).unwrap();

    let solution = CiSolver::new(2).solve(&model, guess).unwrap();
    assert!(solution.all_converged());
    assert_relative_eq!(solution.energies[0], dimer_ground(), epsilon = 1e-8);
    // the Sz = 0 triplet
    assert_abs_diff_eq!(solution.energies[1], 0.0, epsilon = 1e-8);
    assert_abs_diff_eq!(solution.vectors[1].spin_expectation(), 2.0, epsilon = 1e-6);
}

#[test]
fn test_solve_spin_adapted_dimer() {
    let (space, model) = dimer();
    let denom = model.denominator(&CiVector::<f64>::zeros(space));
    let guess = generate_guess(&denom, 2, true).unwrap();

    let solution = CiSolver::new(2).solve_spin_adapted(&model, guess).unwrap();
    assert!(solution.all_converged());
    assert_relative_eq!(solution.energies[0], dimer_ground(), epsilon = 1e-8);
    assert_relative_eq!(solution.energies[1], 4.0, epsilon = 1e-8);
    for v in &solution.vectors {
        assert_abs_diff_eq!(v.spin_expectation(), 0.0, epsilon = 1e-6);
    }
}

#[test]
fn test_chain_with_small_subspace() {
    // free electrons: the sum of the two lowest orbital energies per spin
    let space = Arc::new(DeterminantSpace::new(SpaceParams::new([0, 4, 0], 2, 2, 0, 0)));
    let model = HubbardModel::chain(4, 1.0, false, 0.0);
    let orbital = model.orbital_energies();
    let expected = 2.0 * (orbital[0] + orbital[1]);
    assert_relative_eq!(expected, -2.0 * 5.0_f64.sqrt(), epsilon = 1e-12);

    let denom = model.denominator(&CiVector::<f64>::zeros(space));
    let guess = generate_guess(&denom, 1, false).unwrap();
    let solver = CiSolver {
        max_subspace: 4,
        max_iter: 200,
        ..CiSolver::new(1)
    };
    let solution = solver.solve(&model, guess).unwrap();
    assert!(solution.all_converged());
    assert_relative_eq!(solution.energies[0], expected, epsilon = 1e-8);
}

#[test]
fn test_converged_residual_norm_below_threshold() {
    let space = Arc::new(DeterminantSpace::new(SpaceParams::new([2, 2, 2], 3, 3, 2, 2)));
    let model = HubbardModel::chain(6, 1.0, false, 2.0);
    let denom = model.denominator(&CiVector::<f64>::zeros(space));
    let guess = generate_guess(&denom, 1, false).unwrap();
    let solver = CiSolver {
        thresh: 1.0e-3,
        ..CiSolver::new(1)
    };
    let solution = solver.solve(&model, guess).unwrap();
    assert!(solution.all_converged());

    let c = &solution.vectors[0];
    let mut residual = model.form_sigma(&[c.clone()], &[false]).remove(0);
    residual.ax_plus_y(-solution.energies[0], c);
    assert!(residual.norm() < solver.thresh);
    assert_relative_eq!(residual.norm(), solution.errors[0], epsilon = 1e-10);
}

#[test]
fn test_unconverged_run_is_reported() {
    let space = Arc::new(DeterminantSpace::new(SpaceParams::new([0, 4, 0], 2, 2, 0, 0)));
    let model = HubbardModel::chain(4, 1.0, true, 2.0);
    let denom = model.denominator(&CiVector::<f64>::zeros(space));
    let guess = generate_guess(&denom, 1, false).unwrap();
    let solver = CiSolver {
        max_iter: 1,
        ..CiSolver::new(1)
    };
    let solution = solver.solve(&model, guess).unwrap();
    assert_eq!(solution.iterations, 1);
    assert!(!solution.all_converged());
    assert!(solution.errors[0] > solver.thresh);
}

#[test]
fn test_generate_guess() {
    let (space, model) = dimer();
    let denom = model.denominator(&CiVector::<f64>::zeros(space));

    let guess = generate_guess(&denom, 4, false).unwrap();
    assert_eq!(guess.len(), 4);
    assert_eq!(guess[0].element(0b01, 0b10), Some(1.0));
    assert_eq!(guess[1].element(0b10, 0b01), Some(1.0));

    // the two open-shell determinants share one pattern
    let adapted = generate_guess(&denom, 3, true).unwrap();
    assert_eq!(adapted[0].element(0b01, 0b10), Some(1.0));
    assert_eq!(adapted[1].element(0b01, 0b01), Some(1.0));
    assert!(generate_guess(&denom, 4, true).is_err());
}

#[test]
fn test_distributed_solve() {
    let space = Arc::new(DeterminantSpace::new(SpaceParams::new([1, 3, 1], 2, 2, 1, 1)));
    let model = HubbardModel::chain(5, 1.0, false, 3.0);

    let denom = model.denominator(&CiVector::<f64>::zeros(space.clone()));
    let guess = generate_guess(&denom, 2, true).unwrap();
    let local = CiSolver::new(2).solve_spin_adapted(&model, guess).unwrap();
    assert!(local.all_converged());

    let results = run_ranks(2, |comm| {
        let template = DistCiVector::<f64>::new(space.clone(), comm.clone());
        let denom = model.denominator(&template);
        let guess = generate_guess(&denom, 2, true).unwrap();
        let solver = CiSolver {
            verbose: comm.is_root(),
            ..CiSolver::new(2)
        };
        solver.solve_spin_adapted(&model, guess).unwrap().energies
    })
    .unwrap();

    for energies in results {
        for (e, expected) in energies.iter().zip(&local.energies) {
            assert_relative_eq!(*e, *expected, epsilon = 1e-7);
        }
    }
}
