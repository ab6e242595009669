//! CI vector held entirely by one rank
//!
//! All blocks live in one contiguous buffer in block order; block `i` starts
//! at `blockinfo[i].offset()`.

use rayon::prelude::*;
use std::sync::Arc;

use super::amplitude::Amplitude;
use super::ops::{
    block_routes, by_magnitude, by_value, target_space, CiVectorOps, Determinant,
};
use crate::block_impl::{CiBlock, CiBlockMut};
use crate::comm_impl::Communicator;
use crate::space_impl::{Action, BlockInfo, DeterminantSpace, Spin};

#[derive(Debug, Clone)]
pub struct CiVector<T> {
    space: Arc<DeterminantSpace>,
    data: Vec<T>,
}

impl<T: Amplitude> CiVector<T> {
    pub fn zeros(space: Arc<DeterminantSpace>) -> Self {
        let data = vec![T::lift(0.0); space.size()];
        CiVector { space, data }
    }

    pub fn from_data(space: Arc<DeterminantSpace>, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            space.size(),
            "buffer length does not match the determinant space"
        );
        CiVector { space, data }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn block<'a>(&'a self, info: &'a BlockInfo) -> CiBlock<'a, T> {
        CiBlock::new(info, &self.data[info.offset()..info.offset() + info.size()])
    }

    pub fn block_mut<'a>(&'a mut self, info: &'a BlockInfo) -> CiBlockMut<'a, T> {
        CiBlockMut::new(info, &mut self.data[info.offset()..info.offset() + info.size()])
    }

    /// Non-null blocks in order
    pub fn blocks(&self) -> impl Iterator<Item = CiBlock<'_, T>> {
        self.space.blocks().map(move |info| self.block(info))
    }

    fn position(&self, abits: u64, bbits: u64) -> Option<usize> {
        let (block, ia, ib) = self.space.locate(abits, bbits)?;
        let info = self.space.blockinfo()[block].as_ref()?;
        Some(info.offset() + ia * info.lenb() + ib)
    }

    /// Amplitude of a determinant given by its bit patterns (slow path)
    pub fn element(&self, abits: u64, bbits: u64) -> Option<T> {
        self.position(abits, bbits).map(|i| self.data[i])
    }

    pub fn element_mut(&mut self, abits: u64, bbits: u64) -> Option<&mut T> {
        self.position(abits, bbits).map(move |i| &mut self.data[i])
    }

    /// Every determinant in storage order
    pub fn determinants(&self) -> impl Iterator<Item = Determinant<T>> + '_ {
        self.space.blocks().flat_map(move |info| {
            let aclass = self.space.stringsa().class(info.alpha_class());
            let bclass = self.space.stringsb().class(info.beta_class());
            self.block(info)
                .rows()
                .enumerate()
                .flat_map(move |(ia, row)| {
                    row.iter().enumerate().map(move |(ib, &value)| Determinant {
                        abits: aclass.string(ia),
                        bbits: bclass.string(ib),
                        value,
                    })
                })
        })
    }

    /// Replaces the data on every rank by the data on `root`
    pub fn synchronize(&mut self, comm: &Communicator, root: usize) {
        comm.broadcast(&mut self.data, root);
        assert_eq!(self.data.len(), self.space.size(), "broadcast changed the vector length");
    }

    /// Copy over `space`, which must be the alpha / beta swap of this space
    pub fn transpose_to(&self, space: Arc<DeterminantSpace>) -> Self {
        assert!(
            space.nelea() == self.space.neleb() && space.neleb() == self.space.nelea(),
            "transpose target is not the swapped space"
        );
        let mut out = CiVector::zeros(space.clone());
        for info in self.space.blocks() {
            let Some(tinfo) = space.block_info(info.key().transpose()) else {
                continue;
            };
            let source = self.block(info).as_matrix();
            out.block_mut(tinfo).as_matrix_mut().tr_copy_from(&source);
        }
        out
    }

    fn same_layout(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.space, &other.space) || self.space == other.space
    }
}

impl<T: Amplitude> CiVectorOps for CiVector<T> {
    type Elem = T;

    fn space(&self) -> &Arc<DeterminantSpace> {
        &self.space
    }

    fn zeros_in(&self, space: Arc<DeterminantSpace>) -> Self {
        CiVector::zeros(space)
    }

    fn zero(&mut self) {
        self.data.fill(T::lift(0.0));
    }

    fn global_size(&self) -> usize {
        self.data.len()
    }

    fn dot_product(&self, other: &Self) -> T {
        assert!(
            self.space.is_compatible(&other.space),
            "dot product of vectors over incompatible spaces"
        );
        if self.same_layout(other) {
            return self
                .data
                .iter()
                .zip(&other.data)
                .fold(T::lift(0.0), |acc, (&a, &b)| acc + a.conj_mul(b));
        }
        let mut sum = T::lift(0.0);
        for info in self.space.blocks() {
            let Some(oinfo) = other.space.block_info(info.key()) else {
                continue;
            };
            for (&a, &b) in self.block(info).data().iter().zip(other.block(oinfo).data()) {
                sum += a.conj_mul(b);
            }
        }
        sum
    }

    fn scale(&mut self, a: T) {
        self.data.par_iter_mut().for_each(|x| *x *= a);
    }

    fn ax_plus_y(&mut self, a: T, x: &Self) {
        assert!(
            self.space.is_compatible(&x.space),
            "ax_plus_y of vectors over incompatible spaces"
        );
        if self.same_layout(x) {
            self.data
                .par_iter_mut()
                .zip(x.data.par_iter())
                .for_each(|(y, &x)| *y += a * x);
            return;
        }
        let space = self.space.clone();
        for info in space.blocks() {
            let Some(xinfo) = x.space.block_info(info.key()) else {
                continue;
            };
            let source = x.block(xinfo);
            let mut dest = self.block_mut(info);
            for (y, &x) in dest.data_mut().iter_mut().zip(source.data()) {
                *y += a * x;
            }
        }
    }

    fn apply(&self, orbital: usize, action: Action, spin: Spin) -> Self {
        let target = target_space(&self.space, orbital, action, spin);
        let mut out = CiVector::zeros(target.clone());

        for route in block_routes(&self.space, &target, orbital, action, spin) {
            let source = self.block(route.source);
            let mut dest = out.block_mut(route.target);
            match spin {
                Spin::Alpha => {
                    for (ia, entry) in route.map.iter().enumerate() {
                        if let Some((ta, sign)) = *entry {
                            for (d, &s) in dest.row_mut(ta).iter_mut().zip(source.row(ia)) {
                                *d += s.scale(sign);
                            }
                        }
                    }
                }
                Spin::Beta => {
                    for (ia, srow) in source.rows().enumerate() {
                        let drow = dest.row_mut(ia);
                        for (ib, entry) in route.map.iter().enumerate() {
                            if let Some((tb, sign)) = *entry {
                                drow[tb] += srow[ib].scale(sign);
                            }
                        }
                    }
                }
            }
        }
        out
    }

    fn transpose(&self) -> Self {
        self.transpose_to(Arc::new(self.space.transpose()))
    }

    fn fill_with<F>(&mut self, f: F)
    where
        F: Fn(u64, u64) -> T + Sync,
    {
        let space = self.space.clone();
        for info in space.blocks() {
            let aclass = space.stringsa().class(info.alpha_class());
            let bclass = space.stringsb().class(info.beta_class());
            self.block_mut(info)
                .data_mut()
                .par_chunks_mut(info.lenb())
                .enumerate()
                .for_each(|(ia, row)| {
                    let abits = aclass.string(ia);
                    for (x, &bbits) in row.iter_mut().zip(bclass.strings()) {
                        *x = f(abits, bbits);
                    }
                });
        }
    }

    fn zip_map<F>(&mut self, a: &Self, b: &Self, f: F)
    where
        F: Fn(T, T, T) -> T + Sync,
    {
        assert!(
            self.same_layout(a) && self.same_layout(b),
            "zip_map needs vectors over one space"
        );
        self.data
            .par_iter_mut()
            .zip(a.data.par_iter())
            .zip(b.data.par_iter())
            .for_each(|((x, &p), &q)| *x = f(*x, p, q));
    }

    fn set_determinant(&mut self, abits: u64, bbits: u64, value: T) {
        match self.element_mut(abits, bbits) {
            Some(x) => *x = value,
            None => panic!(
                "determinant {:#b}/{:#b} is outside the space",
                abits, bbits
            ),
        }
    }

    fn lowest_elements(&self, n: usize) -> Vec<Determinant<T>> {
        let mut all: Vec<_> = self.determinants().collect();
        all.sort_by(by_value);
        all.truncate(n);
        all
    }

    fn significant_elements(&self, threshold: f64) -> Vec<Determinant<T>> {
        let mut found: Vec<_> = self
            .determinants()
            .filter(|d| d.value.modulus() >= threshold)
            .collect();
        found.sort_by(by_magnitude);
        found
    }
}
