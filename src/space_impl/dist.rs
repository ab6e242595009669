//! Static range partition of an index range over ranks

/// Splits `0..nele` into `nproc` contiguous ranges whose sizes differ by at
/// most one; the first `nele % nproc` ranks get the extra element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticDist {
    nele: usize,
    start: Vec<usize>,
}

impl StaticDist {
    pub fn new(nele: usize, nproc: usize) -> Self {
        assert!(nproc > 0, "cannot distribute over zero ranks");
        let base = nele / nproc;
        let rem = nele % nproc;
        let mut start = Vec::with_capacity(nproc + 1);
        start.push(0);
        for rank in 0..nproc {
            let last = start[rank];
            start.push(last + base + usize::from(rank < rem));
        }
        StaticDist { nele, start }
    }

    pub fn nele(&self) -> usize {
        self.nele
    }

    pub fn nproc(&self) -> usize {
        self.start.len() - 1
    }

    /// Half-open range owned by `rank`
    pub fn range(&self, rank: usize) -> (usize, usize) {
        (self.start[rank], self.start[rank + 1])
    }

    pub fn start(&self, rank: usize) -> usize {
        self.start[rank]
    }

    pub fn size(&self, rank: usize) -> usize {
        self.start[rank + 1] - self.start[rank]
    }

    /// Owning rank and offset inside that rank's range
    pub fn locate(&self, index: usize) -> (usize, usize) {
        assert!(index < self.nele, "index {} outside distributed range {}", index, self.nele);
        let rank = self.start[1..].partition_point(|&s| s <= index);
        (rank, index - self.start[rank])
    }
}
