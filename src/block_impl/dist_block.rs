//! Alpha-range shard of a block owned by one rank

use nalgebra::{DMatrixView, DMatrixViewMut};

use super::block::Block;
use crate::civec_impl::Amplitude;
use crate::space_impl::{BlockInfo, StaticDist};

#[derive(Debug, Clone)]
pub struct DistBlock<T> {
    info: BlockInfo,
    astart: usize,
    aend: usize,
    data: Vec<T>,
}

impl<T: Amplitude> DistBlock<T> {
    /// Zeroed shard of `info` for `rank` out of `nproc`
    pub fn new(info: &BlockInfo, nproc: usize, rank: usize) -> Self {
        let (astart, aend) = StaticDist::new(info.lena(), nproc).range(rank);
        DistBlock {
            info: info.clone(),
            astart,
            aend,
            data: vec![T::lift(0.0); (aend - astart) * info.lenb()],
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Row of alpha string `ia` (block-local index, must be owned)
    pub fn row(&self, ia: usize) -> &[T] {
        assert!(self.owns(ia), "alpha string {} is not held by this shard", ia);
        let lenb = self.info.lenb();
        let start = (ia - self.astart) * lenb;
        &self.data[start..start + lenb]
    }

    pub fn row_mut(&mut self, ia: usize) -> &mut [T] {
        assert!(self.owns(ia), "alpha string {} is not held by this shard", ia);
        let lenb = self.info.lenb();
        let start = (ia - self.astart) * lenb;
        &mut self.data[start..start + lenb]
    }

    pub fn get(&self, ia: usize, ib: usize) -> T {
        self.row(ia)[ib]
    }

    pub fn set(&mut self, ia: usize, ib: usize, value: T) {
        self.row_mut(ia)[ib] = value;
    }

    /// `lenb x asize` matrix of the shard
    pub fn as_matrix(&self) -> DMatrixView<'_, T> {
        DMatrixView::from_slice(&self.data, self.info.lenb(), self.asize())
    }

    pub fn as_matrix_mut(&mut self) -> DMatrixViewMut<'_, T> {
        let (lenb, asize) = (self.info.lenb(), self.asize());
        DMatrixViewMut::from_slice(&mut self.data, lenb, asize)
    }

    pub fn zero(&mut self) {
        self.data.fill(T::lift(0.0));
    }
}

impl<T> Block for DistBlock<T> {
    fn info(&self) -> &BlockInfo {
        &self.info
    }

    fn astart(&self) -> usize {
        self.astart
    }

    fn aend(&self) -> usize {
        self.aend
    }
}
