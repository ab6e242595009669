//! Determinant space: pairs of alpha / beta string classes
//!
//! The space owns the alpha and beta string spaces and the ordered list of
//! blocks, one per (alpha class, beta class) pair. Pairs that violate the
//! combined hole / particle bounds are kept as `None` entries so that block
//! `i` means the same thing in every vector built over the same space.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use super::string_space::{Action, ClassKey, RasWindows, Spin, StringSpace, MAX_ORBITALS};

/// Parameters a determinant space is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpaceParams {
    pub ras: RasWindows,
    pub nelea: usize,
    pub neleb: usize,
    pub max_holes: usize,
    pub max_particles: usize,
}

impl SpaceParams {
    pub fn new(
        ras: RasWindows,
        nelea: usize,
        neleb: usize,
        max_holes: usize,
        max_particles: usize,
    ) -> Self {
        SpaceParams {
            ras,
            nelea,
            neleb,
            max_holes,
            max_particles,
        }
    }

    pub fn norb(&self) -> usize {
        self.ras.iter().sum()
    }

    /// Alpha / beta swapped parameters
    pub fn transpose(&self) -> Self {
        SpaceParams {
            nelea: self.neleb,
            neleb: self.nelea,
            ..*self
        }
    }

    /// RAS window (0, 1 or 2) holding `orbital`
    pub fn ras_window(&self, orbital: usize) -> usize {
        assert!(orbital < self.norb(), "orbital {} out of range", orbital);
        usize::from(orbital >= self.ras[0]) + usize::from(orbital >= self.ras[0] + self.ras[1])
    }

    /// Parameters of the space reached by one creation / annihilation
    pub fn after_operator(&self, orbital: usize, action: Action, spin: Spin) -> Self {
        let window = self.ras_window(orbital);
        let delta = action.delta();
        let (da, db) = match spin {
            Spin::Alpha => (delta, 0),
            Spin::Beta => (0, delta),
        };
        let nelea = self.nelea as i64 + da;
        let neleb = self.neleb as i64 + db;
        assert!(
            nelea >= 0 && neleb >= 0,
            "annihilation on an empty string space"
        );
        let max_holes = self.max_holes as i64 - if window == 0 { delta } else { 0 };
        let max_particles = self.max_particles as i64 + if window == 2 { delta } else { 0 };

        SpaceParams {
            ras: self.ras,
            nelea: nelea as usize,
            neleb: neleb as usize,
            max_holes: max_holes.max(0) as usize,
            max_particles: max_particles.max(0) as usize,
        }
    }

    /// Target of S+: one beta electron flipped to alpha
    pub fn raise_spin(&self) -> Self {
        assert!(
            self.neleb > 0 && self.nelea < self.norb(),
            "S+ has no beta electron to flip"
        );
        SpaceParams {
            nelea: self.nelea + 1,
            neleb: self.neleb - 1,
            ..*self
        }
    }

    /// Target of S-: one alpha electron flipped to beta
    pub fn lower_spin(&self) -> Self {
        assert!(
            self.nelea > 0 && self.neleb < self.norb(),
            "S- has no alpha electron to flip"
        );
        SpaceParams {
            nelea: self.nelea - 1,
            neleb: self.neleb + 1,
            ..*self
        }
    }

    pub fn can_raise_spin(&self) -> bool {
        self.neleb > 0 && self.nelea < self.norb()
    }

    pub fn can_lower_spin(&self) -> bool {
        self.nelea > 0 && self.neleb < self.norb()
    }
}

/// (alpha class, beta class) signature of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub alpha: ClassKey,
    pub beta: ClassKey,
}

impl BlockKey {
    pub fn new(alpha: ClassKey, beta: ClassKey) -> Self {
        BlockKey { alpha, beta }
    }

    pub fn from_counts(nha: usize, nhb: usize, npa: usize, npb: usize) -> Self {
        BlockKey::new(ClassKey::new(nha, npa), ClassKey::new(nhb, npb))
    }

    pub fn transpose(self) -> Self {
        BlockKey::new(self.beta, self.alpha)
    }
}

/// Descriptor of one non-empty block
#[derive(Debug, Clone)]
pub struct BlockInfo {
    index: usize,
    key: BlockKey,
    alpha_class: usize,
    beta_class: usize,
    lena: usize,
    lenb: usize,
    offset: usize,
}

impl BlockInfo {
    /// Position of the block in `blockinfo`
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn key(&self) -> BlockKey {
        self.key
    }

    pub fn alpha_class(&self) -> usize {
        self.alpha_class
    }

    pub fn beta_class(&self) -> usize {
        self.beta_class
    }

    pub fn lena(&self) -> usize {
        self.lena
    }

    pub fn lenb(&self) -> usize {
        self.lenb
    }

    pub fn size(&self) -> usize {
        self.lena * self.lenb
    }

    /// Offset of the block in a contiguous (local) vector buffer
    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[derive(Debug, Clone)]
pub struct DeterminantSpace {
    params: SpaceParams,
    alpha: StringSpace,
    beta: StringSpace,
    blockinfo: Vec<Option<BlockInfo>>,
    lookup: HashMap<BlockKey, usize>,
    size: usize,
}

impl DeterminantSpace {
    pub fn new(params: SpaceParams) -> Self {
        let norb = params.norb();
        assert!(
            norb <= MAX_ORBITALS,
            "{} orbitals exceed the {}-bit string limit",
            norb,
            MAX_ORBITALS
        );

        let alpha = StringSpace::new(params.ras, params.nelea, params.max_holes, params.max_particles);
        let beta = StringSpace::new(params.ras, params.neleb, params.max_holes, params.max_particles);

        let mut blockinfo = Vec::with_capacity(alpha.classes().len() * beta.classes().len());
        let mut lookup = HashMap::new();
        let mut offset = 0;
        for (ia, sa) in alpha.classes().iter().enumerate() {
            for (ib, sb) in beta.classes().iter().enumerate() {
                let index = blockinfo.len();
                let allowed = sa.nholes() + sb.nholes() <= params.max_holes
                    && sa.nparticles() + sb.nparticles() <= params.max_particles;
                if !allowed || sa.is_empty() || sb.is_empty() {
                    blockinfo.push(None);
                    continue;
                }
                let key = BlockKey::new(sa.key(), sb.key());
                let info = BlockInfo {
                    index,
                    key,
                    alpha_class: ia,
                    beta_class: ib,
                    lena: sa.len(),
                    lenb: sb.len(),
                    offset,
                };
                offset += info.size();
                lookup.insert(key, index);
                blockinfo.push(Some(info));
            }
        }

        debug!(
            "Determinant space ras={:?} nelea={} neleb={} holes<={} particles<={}: {} blocks, {} determinants",
            params.ras,
            params.nelea,
            params.neleb,
            params.max_holes,
            params.max_particles,
            lookup.len(),
            offset
        );

        DeterminantSpace {
            params,
            alpha,
            beta,
            blockinfo,
            lookup,
            size: offset,
        }
    }

    pub fn params(&self) -> SpaceParams {
        self.params
    }

    pub fn norb(&self) -> usize {
        self.params.norb()
    }

    pub fn nelea(&self) -> usize {
        self.params.nelea
    }

    pub fn neleb(&self) -> usize {
        self.params.neleb
    }

    /// Size of RAS window `k`
    pub fn ras(&self, k: usize) -> usize {
        self.params.ras[k]
    }

    pub fn max_holes(&self) -> usize {
        self.params.max_holes
    }

    pub fn max_particles(&self) -> usize {
        self.params.max_particles
    }

    /// nelea - neleb
    pub fn nspin(&self) -> i64 {
        self.params.nelea as i64 - self.params.neleb as i64
    }

    pub fn stringsa(&self) -> &StringSpace {
        &self.alpha
    }

    pub fn stringsb(&self) -> &StringSpace {
        &self.beta
    }

    pub fn strings(&self, spin: Spin) -> &StringSpace {
        match spin {
            Spin::Alpha => &self.alpha,
            Spin::Beta => &self.beta,
        }
    }

    pub fn lena(&self) -> usize {
        self.alpha.size()
    }

    pub fn lenb(&self) -> usize {
        self.beta.size()
    }

    /// Total number of determinants
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn blockinfo(&self) -> &[Option<BlockInfo>] {
        &self.blockinfo
    }

    /// Non-empty blocks in order
    pub fn blocks(&self) -> impl Iterator<Item = &BlockInfo> {
        self.blockinfo.iter().flatten()
    }

    pub fn nblocks(&self) -> usize {
        self.lookup.len()
    }

    pub fn block_index(&self, key: BlockKey) -> Option<usize> {
        self.lookup.get(&key).copied()
    }

    pub fn block_info(&self, key: BlockKey) -> Option<&BlockInfo> {
        self.block_index(key)
            .and_then(|i| self.blockinfo[i].as_ref())
    }

    /// (block index, alpha index in block, beta index in block) of a determinant
    pub fn locate(&self, abits: u64, bbits: u64) -> Option<(usize, usize, usize)> {
        let (ca, ia) = self.alpha.locate(abits)?;
        let (cb, ib) = self.beta.locate(bbits)?;
        let key = BlockKey::new(self.alpha.class(ca).key(), self.beta.class(cb).key());
        self.block_index(key).map(|block| (block, ia, ib))
    }

    /// Blocks whose alpha strings belong to alpha class `class`
    pub fn blocks_with_alpha(&self, class: usize) -> impl Iterator<Item = &BlockInfo> {
        self.blocks().filter(move |b| b.alpha_class() == class)
    }

    /// Alpha / beta swapped space
    pub fn transpose(&self) -> DeterminantSpace {
        DeterminantSpace::new(self.params.transpose())
    }

    /// Same electron and orbital counts; bounds may differ
    pub fn is_compatible(&self, other: &DeterminantSpace) -> bool {
        self.params.nelea == other.params.nelea
            && self.params.neleb == other.params.neleb
            && self.norb() == other.norb()
    }

    pub fn string_bits_a(&self, index: usize) -> u64 {
        self.alpha.bits(index)
    }

    pub fn string_bits_b(&self, index: usize) -> u64 {
        self.beta.bits(index)
    }

    /// Occupation of orbitals `range` as `2`, `a`, `b` or `.`
    pub fn print_bit(&self, abits: u64, bbits: u64, start: usize, end: usize) -> String {
        (start..end)
            .map(|p| {
                let bit = 1u64 << p;
                match (abits & bit != 0, bbits & bit != 0) {
                    (true, true) => '2',
                    (true, false) => 'a',
                    (false, true) => 'b',
                    (false, false) => '.',
                }
            })
            .collect()
    }

    /// `ras1-ras2-ras3` occupation string of a determinant
    pub fn format_determinant(&self, abits: u64, bbits: u64) -> String {
        let ras1 = self.ras(0);
        let ras12 = ras1 + self.ras(1);
        format!(
            "{}-{}-{}",
            self.print_bit(abits, bbits, 0, ras1),
            self.print_bit(abits, bbits, ras1, ras12),
            self.print_bit(abits, bbits, ras12, self.norb())
        )
    }
}

impl PartialEq for DeterminantSpace {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
    }
}

impl fmt::Display for DeterminantSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RAS({},{},{}) nelea={} neleb={} max_holes={} max_particles={} [{} blocks, {} determinants]",
            self.ras(0),
            self.ras(1),
            self.ras(2),
            self.nelea(),
            self.neleb(),
            self.max_holes(),
            self.max_particles(),
            self.nblocks(),
            self.size
        )
    }
}
