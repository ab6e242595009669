//! Views of one block inside a contiguous vector buffer

use nalgebra::{DMatrixView, DMatrixViewMut, Scalar};

use crate::space_impl::{BlockInfo, BlockKey};

/// Dense (alpha class, beta class) block of amplitudes.
///
/// Elements are stored alpha-major: local row `ia - astart` holds the `lenb`
/// amplitudes of alpha string `ia`.
pub trait Block {
    fn info(&self) -> &BlockInfo;

    /// First alpha string held locally
    fn astart(&self) -> usize;

    /// One past the last alpha string held locally
    fn aend(&self) -> usize;

    fn key(&self) -> BlockKey {
        self.info().key()
    }

    fn lena(&self) -> usize {
        self.info().lena()
    }

    fn lenb(&self) -> usize {
        self.info().lenb()
    }

    fn asize(&self) -> usize {
        self.aend() - self.astart()
    }

    /// Number of locally held elements
    fn size(&self) -> usize {
        self.asize() * self.lenb()
    }

    fn global_size(&self) -> usize {
        self.info().size()
    }

    fn owns(&self, ia: usize) -> bool {
        ia >= self.astart() && ia < self.aend()
    }

    /// Position of local element `local` in the unsharded vector
    fn global_index(&self, local: usize) -> usize {
        assert!(local < self.size(), "local index {} outside the shard", local);
        self.info().offset() + self.astart() * self.lenb() + local
    }
}

/// Read-only block of a local vector
#[derive(Debug, Clone, Copy)]
pub struct CiBlock<'a, T> {
    info: &'a BlockInfo,
    data: &'a [T],
}

impl<'a, T> CiBlock<'a, T> {
    pub fn new(info: &'a BlockInfo, data: &'a [T]) -> Self {
        assert_eq!(data.len(), info.size(), "block buffer has the wrong length");
        CiBlock { info, data }
    }

    pub fn data(&self) -> &'a [T] {
        self.data
    }

    pub fn row(&self, ia: usize) -> &'a [T] {
        let lenb = self.info.lenb();
        &self.data[ia * lenb..(ia + 1) * lenb]
    }

    pub fn rows(&self) -> std::slice::Chunks<'a, T> {
        self.data.chunks(self.info.lenb())
    }
}

impl<'a, T: Copy> CiBlock<'a, T> {
    pub fn get(&self, ia: usize, ib: usize) -> T {
        self.data[ia * self.info.lenb() + ib]
    }
}

impl<'a, T: Scalar> CiBlock<'a, T> {
    /// `lenb x lena` matrix (rows are beta strings)
    pub fn as_matrix(&self) -> DMatrixView<'a, T> {
        DMatrixView::from_slice(self.data, self.info.lenb(), self.info.lena())
    }
}

impl<T> Block for CiBlock<'_, T> {
    fn info(&self) -> &BlockInfo {
        self.info
    }

    fn astart(&self) -> usize {
        0
    }

    fn aend(&self) -> usize {
        self.info.lena()
    }
}

/// Mutable block of a local vector
#[derive(Debug)]
pub struct CiBlockMut<'a, T> {
    info: &'a BlockInfo,
    data: &'a mut [T],
}

impl<'a, T> CiBlockMut<'a, T> {
    pub fn new(info: &'a BlockInfo, data: &'a mut [T]) -> Self {
        assert_eq!(data.len(), info.size(), "block buffer has the wrong length");
        CiBlockMut { info, data }
    }

    pub fn data(&self) -> &[T] {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut *self.data
    }

    pub fn row(&self, ia: usize) -> &[T] {
        let lenb = self.info.lenb();
        &self.data[ia * lenb..(ia + 1) * lenb]
    }

    pub fn row_mut(&mut self, ia: usize) -> &mut [T] {
        let lenb = self.info.lenb();
        &mut self.data[ia * lenb..(ia + 1) * lenb]
    }
}

impl<'a, T: Copy> CiBlockMut<'a, T> {
    pub fn get(&self, ia: usize, ib: usize) -> T {
        self.data[ia * self.info.lenb() + ib]
    }

    pub fn set(&mut self, ia: usize, ib: usize, value: T) {
        self.data[ia * self.info.lenb() + ib] = value;
    }
}

impl<'a, T: Scalar> CiBlockMut<'a, T> {
    pub fn as_matrix_mut(&mut self) -> DMatrixViewMut<'_, T> {
        DMatrixViewMut::from_slice(&mut *self.data, self.info.lenb(), self.info.lena())
    }
}

impl<T> Block for CiBlockMut<'_, T> {
    fn info(&self) -> &BlockInfo {
        self.info
    }

    fn astart(&self) -> usize {
        0
    }

    fn aend(&self) -> usize {
        self.info.lena()
    }
}
