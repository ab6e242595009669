use super::*;
use crate::civec_impl::{CiVector, CiVectorOps};
use crate::space_impl::{DeterminantSpace, SpaceParams};
use std::sync::Arc;

fn sample() -> CiVector<f64> {
    let space = Arc::new(DeterminantSpace::new(SpaceParams::new([1, 3, 1], 2, 1, 1, 1)));
    let mut cc = CiVector::zeros(space);
    cc.fill_with(|a, b| (a as f64) * 0.125 - (b as f64) / 3.0);
    cc
}

#[test]
fn test_archive_file() {
    let cc = sample();
    let path = std::env::temp_dir().join(format!("rasci_archive_{}.yaml", std::process::id()));
    save_archive(&path, &[to_record(&cc)]).unwrap();

    let records = load_archive::<f64>(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].space, cc.space().params());

    let restored = from_record(records.into_iter().next().unwrap()).unwrap();
    assert_eq!(restored.data(), cc.data());
}

#[test]
fn test_record_size_mismatch() {
    let mut record = to_record(&sample());
    record.data.pop();
    assert!(from_record(record).is_err());
}

#[test]
fn test_missing_archive() {
    let path = std::env::temp_dir().join("rasci_no_such_archive.yaml");
    assert!(load_archive::<f64>(&path).is_err());
}

#[test]
fn test_print_state_energies() {
    let mut out = Vec::new();
    print_state_energies(&mut out, &[-1.5, 0.25], &[0.0, 2.0], &[true, false]).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("-1.5000000000"));
    assert!(lines[2].ends_with("(not converged)"));
}
