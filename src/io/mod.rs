//! Input/Output operations for RAS CI calculations
//!
//! This module handles logging setup, result tables and vector archives.

mod archive;
mod output;
#[cfg(test)]
mod tests;

pub use archive::{from_record, load_archive, save_archive, to_record, CiVectorRecord};
pub use output::{print_state_energies, setup_output};
