//! Occupation-class index (RAS determinant space)
//!
//! Orbitals are partitioned into three contiguous windows (RAS1, RAS2, RAS3).
//! Strings of each spin are grouped into classes by (holes in RAS1,
//! electrons in RAS2, particles in RAS3); a determinant space is the ordered
//! list of allowed (alpha class, beta class) blocks.
//!
//! # Usage
//!
//! ```rust
//! use rasci::{DeterminantSpace, SpaceParams};
//!
//! // 2 orbitals in RAS2, one alpha and one beta electron
//! let space = DeterminantSpace::new(SpaceParams::new([0, 2, 0], 1, 1, 0, 0));
//! assert_eq!(space.nblocks(), 1);
//! assert_eq!(space.size(), 4);
//! ```

mod determinants;
mod dist;
mod string_space;

pub use determinants::{BlockInfo, BlockKey, DeterminantSpace, SpaceParams};
pub use dist::StaticDist;
pub use string_space::{
    occupied_below, operator_on_string, string_phase, window_mask, Action, ClassKey, RasWindows,
    Spin, StringClass, StringSpace, MAX_ORBITALS,
};
