use super::*;
use crate::comm_impl::run_ranks;
use crate::space_impl::{Action, DeterminantSpace, SpaceParams, Spin};
use approx::*;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn minimal_space() -> Arc<DeterminantSpace> {
    Arc::new(DeterminantSpace::new(SpaceParams::new([0, 2, 0], 1, 1, 0, 0)))
}

fn ras_space() -> Arc<DeterminantSpace> {
    Arc::new(DeterminantSpace::new(SpaceParams::new([1, 3, 1], 2, 1, 1, 1)))
}

fn random_vector(space: Arc<DeterminantSpace>, seed: u64) -> CiVector<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..space.size()).map(|_| rng.gen_range(-1.0..1.0)).collect();
    CiVector::from_data(space, data)
}

#[test]
fn test_single_block_creation() {
    let mut cc = CiVector::<f64>::zeros(minimal_space());
    assert_eq!(cc.space().nblocks(), 1);
    assert_eq!(cc.size(), 4);

    cc.set_determinant(0b01, 0b01, 1.0);
    assert_eq!(cc.norm(), 1.0);

    let out = cc.apply(1, Action::Create, Spin::Alpha);
    assert_eq!(out.space().nelea(), 2);
    assert_eq!(out.space().neleb(), 1);
    let nonzero: Vec<_> = out.data().iter().filter(|x| **x != 0.0).collect();
    assert_eq!(nonzero, vec![&-1.0]);
    assert_eq!(out.element(0b11, 0b01), Some(-1.0));
}

#[test]
fn test_beta_operator_phase() {
    let mut cc = CiVector::<f64>::zeros(minimal_space());
    cc.set_determinant(0b01, 0b01, 1.0);
    // passes one alpha and one beta electron
    let out = cc.apply(1, Action::Create, Spin::Beta);
    assert_eq!(out.element(0b01, 0b11), Some(1.0));
    // passes only the alpha electron
    let out = cc.apply(0, Action::Annihilate, Spin::Beta);
    assert_eq!(out.space().neleb(), 0);
    assert_eq!(out.element(0b01, 0), Some(-1.0));
}

#[test]
fn test_dot_product_symmetric() {
    let a = random_vector(ras_space(), 1);
    let b = random_vector(ras_space(), 2);
    assert_eq!(a.dot_product(&b), b.dot_product(&a));
    assert_relative_eq!(a.norm() * a.norm(), a.dot_product(&a), epsilon = 1e-12);
    assert_relative_eq!(a.variance(), a.dot_product(&a) / a.size() as f64, epsilon = 1e-14);
    assert_relative_eq!(a.rms(), a.variance().sqrt(), epsilon = 1e-14);
}

#[test]
fn test_truncated_spaces_match_blocks_by_class() {
    let full = random_vector(ras_space(), 3);
    let truncated_space = Arc::new(DeterminantSpace::new(SpaceParams::new([1, 3, 1], 2, 1, 0, 0)));
    assert!(truncated_space.nblocks() < full.space().nblocks());

    let mut truncated = CiVector::zeros(truncated_space);
    truncated.fill_with(|a, b| full.element(a, b).unwrap_or(0.0));

    assert_relative_eq!(
        full.dot_product(&truncated),
        truncated.dot_product(&truncated),
        epsilon = 1e-12
    );
    assert_eq!(full.dot_product(&truncated), truncated.dot_product(&full));

    // only the shared blocks are updated
    let mut y = full.clone();
    y.ax_plus_y(-1.0, &truncated);
    for d in truncated.determinants() {
        assert_eq!(y.element(d.abits, d.bbits), Some(0.0));
    }
}

#[test]
fn test_normalize() {
    let mut v = random_vector(ras_space(), 4);
    let before = v.norm();
    let returned = v.normalize();
    assert_relative_eq!(returned, before, epsilon = 1e-14);
    assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);

    let space = ras_space();
    let mut tiny = CiVector::from_data(space.clone(), vec![1.0e-40; space.size()]);
    let saved = tiny.data().to_vec();
    tiny.normalize();
    assert_eq!(tiny.data(), saved.as_slice());
}

#[test]
fn test_transpose_round_trip() {
    let v = random_vector(ras_space(), 5);
    assert!(v.space().blocks().filter(|b| b.size() > 1).count() >= 2);

    let t = v.transpose();
    assert_eq!(t.space().nelea(), 1);
    assert_eq!(t.space().neleb(), 2);
    for d in v.determinants() {
        assert_eq!(t.element(d.bbits, d.abits), Some(d.value));
    }
    assert_eq!(t.transpose().data(), v.data());
}

#[test]
fn test_orthog() {
    let mut u = random_vector(ras_space(), 6);
    u.normalize();
    let mut v = random_vector(ras_space(), 7);
    let norm = v.orthog([&u]);
    assert!(norm > 0.0);
    assert_abs_diff_eq!(v.dot_product(&u), 0.0, epsilon = 1e-12);
    assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_create_then_annihilate() {
    let v = random_vector(ras_space(), 8);
    // orbital 3 lies in RAS2
    let w = v
        .apply(3, Action::Create, Spin::Alpha)
        .apply(3, Action::Annihilate, Spin::Alpha);
    assert_eq!(w.space().nelea(), v.space().nelea());
    assert_eq!(w.space().neleb(), v.space().neleb());

    // a a+ = 1 - n
    for d in v.determinants() {
        let expected = if d.abits & 0b1000 == 0 { d.value } else { 0.0 };
        assert_relative_eq!(w.element(d.abits, d.bbits).unwrap(), expected, epsilon = 1e-14);
    }
}

#[test]
fn test_apply_shifts_hole_bounds() {
    let v = random_vector(ras_space(), 9);
    let out = v.apply(0, Action::Annihilate, Spin::Beta);
    assert_eq!(out.space().max_holes(), 2);
    assert_eq!(out.space().neleb(), 0);

    let out = v.apply(4, Action::Create, Spin::Alpha);
    assert_eq!(out.space().max_particles(), 2);
}

#[test]
fn test_complex_amplitudes() {
    let mut v = CiVector::<Complex64>::zeros(minimal_space());
    v.set_determinant(0b01, 0b01, Complex64::new(0.0, 1.0));
    v.set_determinant(0b10, 0b01, Complex64::new(1.0, 0.0));
    assert_relative_eq!(v.norm(), 2.0_f64.sqrt(), epsilon = 1e-14);

    let mut w = v.clone_empty();
    w.set_determinant(0b01, 0b01, Complex64::new(1.0, 0.0));
    // <w|v> = i, <v|w> = -i
    assert_eq!(w.dot_product(&v), Complex64::new(0.0, 1.0));
    assert_eq!(v.dot_product(&w), Complex64::new(0.0, -1.0));

    v.normalize();
    assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-14);
}

#[test]
fn test_lowest_and_significant_elements() {
    let mut v = CiVector::<f64>::zeros(minimal_space());
    v.fill_with(|a, b| (a + 2 * b) as f64);

    let lowest = v.lowest_elements(2);
    assert_eq!(lowest.len(), 2);
    assert_eq!((lowest[0].abits, lowest[0].bbits, lowest[0].value), (0b01, 0b01, 3.0));
    assert_eq!((lowest[1].abits, lowest[1].bbits, lowest[1].value), (0b10, 0b01, 4.0));

    let significant = v.significant_elements(5.0);
    let values: Vec<f64> = significant.iter().map(|d| d.value).collect();
    assert_eq!(values, vec![6.0, 5.0]);
}

#[test]
fn test_format_amplitudes() {
    let mut v = CiVector::<f64>::zeros(minimal_space());
    v.set_determinant(0b01, 0b01, 1.0);
    v.set_determinant(0b10, 0b01, -0.01);
    let lines = v.format_amplitudes(0.05);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].trim_start(), "-2.-     1.0000000000");
}

#[test]
fn test_zip_map() {
    let a = random_vector(ras_space(), 10);
    let b = random_vector(ras_space(), 11);
    let mut x = a.clone_empty();
    x.zip_map(&a, &b, |_, p, q| p * q);
    for (i, value) in x.data().iter().enumerate() {
        assert_eq!(*value, a.data()[i] * b.data()[i]);
    }
}

#[test]
fn test_spin_of_closed_and_open_shells() {
    let mut closed = CiVector::<f64>::zeros(minimal_space());
    closed.set_determinant(0b01, 0b01, 1.0);
    assert_abs_diff_eq!(closed.spin_expectation(), 0.0, epsilon = 1e-14);

    let mut open = CiVector::<f64>::zeros(minimal_space());
    open.set_determinant(0b01, 0b10, 1.0);
    assert_relative_eq!(open.spin_expectation(), 1.0, epsilon = 1e-14);

    // high spin: Sz = 1, S = 1
    let triplet_space = Arc::new(DeterminantSpace::new(SpaceParams::new([0, 2, 0], 2, 0, 0, 0)));
    let mut triplet = CiVector::<f64>::zeros(triplet_space);
    triplet.set_determinant(0b11, 0, 1.0);
    assert_relative_eq!(triplet.spin_expectation(), 2.0, epsilon = 1e-14);
    assert!(triplet.spin_raise().is_none());
    assert!(triplet.spin_lower().is_some());
}

#[test]
fn test_spin_decontaminate() {
    let mut open = CiVector::<f64>::zeros(minimal_space());
    open.set_determinant(0b01, 0b10, 1.0);
    open.spin_decontaminate(1.0e-8).unwrap();

    assert_abs_diff_eq!(open.spin_expectation(), 0.0, epsilon = 1e-8);
    assert_relative_eq!(open.norm(), 1.0, epsilon = 1e-12);
    let half = 0.5_f64.sqrt();
    assert_relative_eq!(open.element(0b01, 0b10).unwrap(), half, epsilon = 1e-12);
    assert_relative_eq!(open.element(0b10, 0b01).unwrap(), half, epsilon = 1e-12);
}

#[test]
fn test_distributed_matches_local() {
    let results = run_ranks(3, |comm| {
        let a = random_vector(ras_space(), 12);
        let b = random_vector(ras_space(), 13);
        let da = DistCiVector::from_local(&a, comm.clone());
        let db = DistCiVector::from_local(&b, comm.clone());

        assert_relative_eq!(da.dot_product(&db), a.dot_product(&b), epsilon = 1e-12);
        assert_relative_eq!(da.norm(), a.norm(), epsilon = 1e-12);
        assert_eq!(da.global_size(), a.size());

        let mut sum = da.clone();
        sum.ax_plus_y(0.5, &db);
        let mut expected = a.clone();
        expected.ax_plus_y(0.5, &b);
        assert_eq!(sum.to_local().data(), expected.data());

        for (orbital, action, spin) in [
            (1, Action::Annihilate, Spin::Alpha),
            (3, Action::Create, Spin::Alpha),
            (0, Action::Annihilate, Spin::Beta),
            (4, Action::Create, Spin::Beta),
        ] {
            let local = a.apply(orbital, action, spin);
            let dist = da.apply(orbital, action, spin).to_local();
            assert_eq!(dist.space(), local.space());
            for (x, y) in dist.data().iter().zip(local.data()) {
                assert_relative_eq!(*x, *y, epsilon = 1e-14);
            }
        }

        assert_relative_eq!(da.spin_expectation(), a.spin_expectation(), epsilon = 1e-12);
        da.dot_product(&db)
    })
    .unwrap();

    for r in &results {
        assert_eq!(*r, results[0]);
    }
}

#[test]
fn test_distributed_transpose() {
    // more ranks than strings in some classes
    run_ranks(4, |comm| {
        let v = random_vector(ras_space(), 14);
        let dv = DistCiVector::from_local(&v, comm);

        let pending = dv.transpose();
        let transposed = pending.transpose_wait();
        assert_eq!(transposed.to_local().data(), v.transpose().data());

        let back = CiVectorOps::transpose(&transposed);
        assert_eq!(back.to_local().data(), v.data());
    })
    .unwrap();
}

#[test]
fn test_remote_rows() {
    run_ranks(3, |comm| {
        let v = random_vector(ras_space(), 15);
        let dv = DistCiVector::from_local(&v, comm.clone());
        let space = v.space().clone();

        dv.init_mpi_recv();
        let fetches: Vec<_> = (0..space.lena()).map(|a| dv.get_bstring_buf(a)).collect();
        let mut rows = dv.terminate_mpi_recv();

        for (a, fetch) in fetches.into_iter().enumerate() {
            let row = match fetch {
                RowFetch::Ready(row) => {
                    assert_eq!(dv.alpha_owner(a), comm.rank());
                    row
                }
                RowFetch::Pending(id) => rows.take(id).unwrap(),
            };
            let abits = space.string_bits_a(a);
            for (b, value) in row.iter().enumerate() {
                let expected = v.element(abits, space.string_bits_b(b)).unwrap_or(0.0);
                assert_eq!(*value, expected);
            }
        }
        assert!(rows.is_empty());
    })
    .unwrap();
}

#[test]
fn test_distributed_print_helpers() {
    let results = run_ranks(2, |comm| {
        let v = random_vector(ras_space(), 16);
        let dv = DistCiVector::from_local(&v, comm);
        let lowest = dv.lowest_elements(3);
        assert_eq!(lowest, v.lowest_elements(3));
        let lines = dv.format_amplitudes(0.5);
        assert_eq!(lines, v.format_amplitudes(0.5));
        lines.len()
    })
    .unwrap();
    assert_eq!(results[0], results[1]);
}

#[test]
fn test_copy_and_clone_empty_are_independent() {
    let v = random_vector(ras_space(), 17);
    let mut w = v.copy();
    assert_eq!(w.data(), v.data());
    w.scale(2.0);
    assert_relative_eq!(w.norm(), 2.0 * v.norm(), epsilon = 1e-12);

    let empty = v.clone_empty();
    assert_eq!(empty.size(), v.size());
    assert_eq!(empty.norm(), 0.0);
}

#[test]
fn test_synchronize_from_root() {
    let expected = random_vector(ras_space(), 18);
    let results = run_ranks(3, |comm| {
        let mut v = CiVector::<f64>::zeros(ras_space());
        if comm.rank() == 0 {
            v = random_vector(ras_space(), 18);
        }
        v.synchronize(&comm, 0);
        v.data().to_vec()
    })
    .unwrap();

    for data in results {
        assert_eq!(data, expected.data());
    }
}
