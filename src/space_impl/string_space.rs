//! Occupation strings of one spin and their RAS classes
//!
//! A string is the occupation pattern of one spin's electrons, stored as a
//! `u64` bit pattern (bit `p` set means orbital `p` is occupied). Orbitals are
//! split into three contiguous windows RAS1 / RAS2 / RAS3, and every string is
//! classified by the number of holes in RAS1, electrons in RAS2 and particles
//! in RAS3.

use itertools::{iproduct, Itertools};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

use super::dist::StaticDist;

/// Strings are `u64` bit patterns
pub const MAX_ORBITALS: usize = 64;

/// Sizes of the RAS1, RAS2 and RAS3 windows
pub type RasWindows = [usize; 3];

/// Creation or annihilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Create,
    Annihilate,
}

impl Action {
    /// Change in electron count caused by the operator
    pub fn delta(self) -> i64 {
        match self {
            Action::Create => 1,
            Action::Annihilate => -1,
        }
    }
}

impl From<bool> for Action {
    fn from(create: bool) -> Self {
        if create {
            Action::Create
        } else {
            Action::Annihilate
        }
    }
}

/// Spin channel an operator acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Spin {
    Alpha,
    Beta,
}

impl From<bool> for Spin {
    fn from(alpha: bool) -> Self {
        if alpha {
            Spin::Alpha
        } else {
            Spin::Beta
        }
    }
}

/// (holes in RAS1, particles in RAS3) signature of a string class.
///
/// The RAS2 electron count is implied by the total electron count of the
/// string space the class belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassKey {
    pub holes: usize,
    pub particles: usize,
}

impl ClassKey {
    pub fn new(holes: usize, particles: usize) -> Self {
        ClassKey { holes, particles }
    }

    /// Signature after a single creation / annihilation in `window`.
    ///
    /// Returns `None` when a count would become negative. Whether the result
    /// is feasible is decided by the target string space.
    pub fn after_operator(self, window: usize, action: Action) -> Option<ClassKey> {
        let delta = action.delta();
        match window {
            0 => {
                // creating in RAS1 fills a hole
                let holes = self.holes as i64 - delta;
                (holes >= 0).then(|| ClassKey::new(holes as usize, self.particles))
            }
            1 => Some(self),
            _ => {
                let particles = self.particles as i64 + delta;
                (particles >= 0).then(|| ClassKey::new(self.holes, particles as usize))
            }
        }
    }
}

/// Bit mask covering `range` of orbitals
pub fn window_mask(range: Range<usize>) -> u64 {
    range.fold(0u64, |mask, orbital| mask | (1u64 << orbital))
}

/// Number of occupied orbitals below `orbital`
pub fn occupied_below(bits: u64, orbital: usize) -> u32 {
    (bits & ((1u64 << orbital) - 1)).count_ones()
}

/// Fermionic phase of an operator on `orbital` acting on `bits`
pub fn string_phase(bits: u64, orbital: usize) -> f64 {
    if occupied_below(bits, orbital) % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Result of a single operator on one string: target bits and phase
pub fn operator_on_string(bits: u64, orbital: usize, action: Action) -> Option<(u64, f64)> {
    let bit = 1u64 << orbital;
    match action {
        Action::Create if bits & bit == 0 => Some((bits | bit, string_phase(bits, orbital))),
        Action::Annihilate if bits & bit != 0 => Some((bits & !bit, string_phase(bits, orbital))),
        _ => None,
    }
}

fn occupations(range: Range<usize>, nele: usize) -> Vec<u64> {
    if nele == 0 {
        return vec![0];
    }
    range
        .combinations(nele)
        .map(|orbitals| orbitals.iter().fold(0u64, |acc, &p| acc | (1u64 << p)))
        .collect()
}

/// All strings sharing one (holes, RAS2 electrons, particles) signature
#[derive(Debug, Clone)]
pub struct StringClass {
    key: ClassKey,
    nele2: usize,
    offset: usize,
    strings: Vec<u64>,
}

impl StringClass {
    fn new(ras: RasWindows, key: ClassKey, nele2: usize, offset: usize) -> Self {
        let ras12 = ras[0] + ras[1];
        let norb = ras12 + ras[2];
        let ras1 = occupations(0..ras[0], ras[0] - key.holes);
        let ras2 = occupations(ras[0]..ras12, nele2);
        let ras3 = occupations(ras12..norb, key.particles);

        let mut strings: Vec<u64> = iproduct!(ras1.iter(), ras2.iter(), ras3.iter())
            .map(|(a, b, c)| a | b | c)
            .collect();
        strings.sort_unstable();

        StringClass {
            key,
            nele2,
            offset,
            strings,
        }
    }

    pub fn key(&self) -> ClassKey {
        self.key
    }

    pub fn nholes(&self) -> usize {
        self.key.holes
    }

    pub fn nele2(&self) -> usize {
        self.nele2
    }

    pub fn nparticles(&self) -> usize {
        self.key.particles
    }

    /// Position of the first string of this class in the global ordering
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn strings(&self) -> &[u64] {
        &self.strings
    }

    pub fn string(&self, index: usize) -> u64 {
        self.strings[index]
    }

    /// Index of `bits` inside the class
    pub fn index_of(&self, bits: u64) -> Option<usize> {
        self.strings.binary_search(&bits).ok()
    }

    /// Ownership map of this class over `nproc` ranks
    pub fn dist(&self, nproc: usize) -> StaticDist {
        StaticDist::new(self.len(), nproc)
    }

    /// Maps every string of this class through a single operator into `target`.
    ///
    /// Entry `i` is the target index and phase of string `i`, or `None` when
    /// the operator kills the string or leads outside `target`.
    pub fn operator_map(
        &self,
        orbital: usize,
        action: Action,
        target: &StringClass,
    ) -> Vec<Option<(usize, f64)>> {
        self.strings
            .iter()
            .map(|&bits| {
                operator_on_string(bits, orbital, action)
                    .and_then(|(tbits, sign)| target.index_of(tbits).map(|i| (i, sign)))
            })
            .collect()
    }
}

/// Every string of one spin allowed by the hole / particle bounds
#[derive(Debug, Clone)]
pub struct StringSpace {
    ras: RasWindows,
    nele: usize,
    classes: Vec<StringClass>,
    lookup: HashMap<ClassKey, usize>,
    size: usize,
}

impl StringSpace {
    pub fn new(ras: RasWindows, nele: usize, max_holes: usize, max_particles: usize) -> Self {
        let mut classes = Vec::new();
        let mut lookup = HashMap::new();
        let mut offset = 0;

        for holes in 0..=max_holes.min(ras[0]) {
            for particles in 0..=max_particles.min(ras[2]) {
                let outside = ras[0] - holes + particles;
                if outside > nele || nele - outside > ras[1] {
                    continue;
                }
                let class = StringClass::new(ras, ClassKey::new(holes, particles), nele - outside, offset);
                offset += class.len();
                lookup.insert(class.key(), classes.len());
                classes.push(class);
            }
        }

        StringSpace {
            ras,
            nele,
            classes,
            lookup,
            size: offset,
        }
    }

    pub fn ras(&self) -> RasWindows {
        self.ras
    }

    pub fn norb(&self) -> usize {
        self.ras.iter().sum()
    }

    pub fn nele(&self) -> usize {
        self.nele
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn classes(&self) -> &[StringClass] {
        &self.classes
    }

    pub fn class(&self, index: usize) -> &StringClass {
        &self.classes[index]
    }

    pub fn class_index(&self, key: ClassKey) -> Option<usize> {
        self.lookup.get(&key).copied()
    }

    pub fn class_by_key(&self, key: ClassKey) -> Option<&StringClass> {
        self.class_index(key).map(|i| &self.classes[i])
    }

    /// Class signature of an arbitrary bit pattern
    pub fn key_of(&self, bits: u64) -> ClassKey {
        let ras12 = self.ras[0] + self.ras[1];
        let in_ras1 = (bits & window_mask(0..self.ras[0])).count_ones() as usize;
        let in_ras3 = (bits & window_mask(ras12..self.norb())).count_ones() as usize;
        ClassKey::new(self.ras[0] - in_ras1, in_ras3)
    }

    /// (class index, index in class) of a string, if it belongs to this space
    pub fn locate(&self, bits: u64) -> Option<(usize, usize)> {
        if bits.count_ones() as usize != self.nele {
            return None;
        }
        let class = self.class_index(self.key_of(bits))?;
        self.classes[class].index_of(bits).map(|i| (class, i))
    }

    /// Lexical position of a string in the global ordering
    pub fn global_index(&self, bits: u64) -> Option<usize> {
        self.locate(bits)
            .map(|(class, i)| self.classes[class].offset() + i)
    }

    /// Class holding the global string index `index`
    pub fn class_of_index(&self, index: usize) -> usize {
        assert!(index < self.size, "string index {} out of range", index);
        self.classes
            .partition_point(|c| c.offset() + c.len() <= index)
    }

    /// Bit pattern of the global string index `index`
    pub fn bits(&self, index: usize) -> u64 {
        let class = &self.classes[self.class_of_index(index)];
        class.string(index - class.offset())
    }
}
