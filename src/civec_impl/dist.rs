//! CI vector sharded over ranks
//!
//! Every block keeps only the alpha strings this rank owns under a
//! [`StaticDist`] of the block's alpha class, so all blocks sharing an alpha
//! class are split the same way and a full beta row of any alpha string
//! lives on exactly one rank.
//!
//! Reductions follow the rules of [`Communicator`]: every rank has to call
//! `dot_product`, `norm`, `apply`, `transpose`, ... in the same order.

use nalgebra::DMatrixView;
use rayon::prelude::*;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use super::amplitude::Amplitude;
use super::local::CiVector;
use super::ops::{
    block_routes, by_magnitude, by_value, target_space, CiVectorOps, Determinant,
};
use crate::block_impl::{Block, DistBlock};
use crate::comm_impl::{
    BufferPutRequest, Communicator, ReceivedRows, RecvHandle, RecvRequest, RequestId, Tag,
};
use crate::space_impl::{Action, DeterminantSpace, Spin, StaticDist};

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Request for the beta row of one alpha string
#[derive(Debug, Clone, Copy)]
struct RowCall {
    astring: usize,
}

/// State of an open row retrieval session
struct RowSession<T> {
    recv: RecvRequest<T>,
    put: BufferPutRequest<T>,
}

impl<T: Amplitude> RowSession<T> {
    fn new() -> Self {
        RowSession {
            recv: RecvRequest::new(),
            put: BufferPutRequest::new(),
        }
    }
}

/// Outcome of [`DistCiVector::get_bstring_buf`]
#[derive(Debug, Clone, PartialEq)]
pub enum RowFetch<T> {
    /// The row is held locally
    Ready(Vec<T>),
    /// The row arrives with [`DistCiVector::terminate_mpi_recv`]
    Pending(RequestId),
}

pub struct DistCiVector<T: Amplitude> {
    space: Arc<DeterminantSpace>,
    comm: Communicator,
    blocks: Vec<Option<DistBlock<T>>>,
    global_size: usize,
    session: Mutex<Option<RowSession<T>>>,
}

impl<T: Amplitude> Clone for DistCiVector<T> {
    fn clone(&self) -> Self {
        DistCiVector {
            space: self.space.clone(),
            comm: self.comm.clone(),
            blocks: self.blocks.clone(),
            global_size: self.global_size,
            session: Mutex::new(None),
        }
    }
}

impl<T: Amplitude> DistCiVector<T> {
    pub fn new(space: Arc<DeterminantSpace>, comm: Communicator) -> Self {
        let (nproc, rank) = (comm.size(), comm.rank());
        let blocks = space
            .blockinfo()
            .iter()
            .map(|b| b.as_ref().map(|info| DistBlock::new(info, nproc, rank)))
            .collect();
        let global_size = space.size();
        DistCiVector {
            space,
            comm,
            blocks,
            global_size,
            session: Mutex::new(None),
        }
    }

    /// Shards of a replicated local vector
    pub fn from_local(local: &CiVector<T>, comm: Communicator) -> Self {
        let mut out = DistCiVector::new(local.space().clone(), comm);
        let space = out.space.clone();
        for info in space.blocks() {
            let source = local.block(info);
            if let Some(block) = out.blocks[info.index()].as_mut() {
                for ia in block.astart()..block.aend() {
                    block.row_mut(ia).copy_from_slice(source.row(ia));
                }
            }
        }
        out
    }

    /// Gathers the full vector on every rank
    pub fn to_local(&self) -> CiVector<T> {
        let mut out = CiVector::zeros(self.space.clone());
        for block in self.blocks.iter().flatten() {
            let mut dest = out.block_mut(block.info());
            for ia in block.astart()..block.aend() {
                dest.row_mut(ia).copy_from_slice(block.row(ia));
            }
        }
        self.comm.allreduce_sum(out.data_mut());
        out
    }

    pub fn comm(&self) -> &Communicator {
        &self.comm
    }

    pub fn blocks(&self) -> impl Iterator<Item = &DistBlock<T>> {
        self.blocks.iter().flatten()
    }

    pub fn block(&self, index: usize) -> Option<&DistBlock<T>> {
        self.blocks.get(index).and_then(Option::as_ref)
    }

    pub fn block_mut(&mut self, index: usize) -> Option<&mut DistBlock<T>> {
        self.blocks.get_mut(index).and_then(Option::as_mut)
    }

    /// Number of elements held by this rank
    pub fn local_size(&self) -> usize {
        self.blocks().map(|b| b.size()).sum()
    }

    /// Block of `other` with the same class key as `block`
    fn matching<'a>(&self, other: &'a Self, block: &DistBlock<T>) -> Option<&'a DistBlock<T>> {
        other
            .space
            .block_index(block.key())
            .and_then(|i| other.block(i))
    }

    /// Rank owning the beta rows of global alpha string `astring`
    pub fn alpha_owner(&self, astring: usize) -> usize {
        let alpha = self.space.stringsa();
        let class = alpha.class(alpha.class_of_index(astring));
        class
            .dist(self.comm.size())
            .locate(astring - class.offset())
            .0
    }

    /// Full beta row (over all beta strings) of an owned alpha string
    fn local_row(&self, astring: usize) -> Vec<T> {
        let alpha = self.space.stringsa();
        let class = alpha.class_of_index(astring);
        let ia = astring - alpha.class(class).offset();
        let mut row = vec![T::lift(0.0); self.space.lenb()];
        for info in self.space.blocks_with_alpha(class) {
            let Some(block) = self.block(info.index()) else {
                continue;
            };
            let offset = self.space.stringsb().class(info.beta_class()).offset();
            row[offset..offset + block.lenb()].copy_from_slice(block.row(ia));
        }
        row
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<RowSession<T>>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a row retrieval session.
    ///
    /// Row requests are not addressed to a particular vector, so only one
    /// session may be open per communicator at a time.
    pub fn init_mpi_recv(&self) {
        let mut session = self.lock_session();
        assert!(session.is_none(), "row retrieval session already open");
        *session = Some(RowSession::new());
    }

    /// Beta row of global alpha string `astring`.
    ///
    /// Rows owned by another rank are requested from their owner and become
    /// available once [`DistCiVector::terminate_mpi_recv`] returns.
    pub fn get_bstring_buf(&self, astring: usize) -> RowFetch<T> {
        let owner = self.alpha_owner(astring);
        if owner == self.comm.rank() {
            return RowFetch::Ready(self.local_row(astring));
        }
        let mut guard = self.lock_session();
        let Some(session) = guard.as_mut() else {
            panic!("get_bstring_buf outside a row retrieval session");
        };
        let id = session
            .recv
            .request_recv(&self.comm, owner, Tag::Row(astring as u64));
        self.comm.isend(vec![RowCall { astring }], owner, Tag::RowRequest);
        RowFetch::Pending(id)
    }

    /// Answers incoming row requests and sends every staged write.
    /// Returns the number of messages sent.
    pub fn flush(&self) -> usize {
        let mut guard = self.lock_session();
        let Some(session) = guard.as_mut() else {
            panic!("flush outside a row retrieval session");
        };
        while let Some((source, calls)) = self.comm.try_recv_any::<RowCall>(Tag::RowRequest) {
            for call in calls {
                session.put.stage(
                    source,
                    Tag::Row(call.astring as u64),
                    self.local_row(call.astring),
                );
            }
        }
        session.put.flush(&self.comm)
    }

    /// Waits until the requests of every rank are answered, then closes the
    /// session and hands over the received rows.
    ///
    /// Collective: all ranks must call it.
    pub fn terminate_mpi_recv(&self) -> ReceivedRows<T> {
        let mut rounds = 0usize;
        loop {
            self.flush();
            let done = {
                let mut guard = self.lock_session();
                match guard.as_mut() {
                    Some(session) => session.recv.test(&self.comm),
                    None => panic!("terminate_mpi_recv outside a row retrieval session"),
                }
            };
            let mut vote = [usize::from(!done)];
            self.comm.soft_allreduce(&mut vote);
            if vote[0] == 0 {
                break;
            }
            rounds += 1;
            std::thread::sleep(POLL_INTERVAL);
        }
        debug!("Row retrieval finished after {} polling rounds", rounds);

        match self.lock_session().take() {
            Some(session) => session.recv.into_received(),
            None => panic!("row retrieval session closed twice"),
        }
    }

    /// Starts the alpha / beta swap; the result is only reachable through
    /// [`PendingTranspose::transpose_wait`].
    ///
    /// Every source shard is cut along the beta ranges owned by each rank in
    /// the transposed vector; each piece goes to its owner, the own piece is
    /// kept aside.
    pub fn transpose(&self) -> PendingTranspose<T> {
        let tspace = Arc::new(self.space.transpose());
        let out = DistCiVector::new(tspace.clone(), self.comm.clone());
        let (nranks, me) = (self.comm.size(), self.comm.rank());

        let mut buf = Vec::new();
        let mut pending = Vec::new();
        for block in self.blocks() {
            let Some(tinfo) = tspace.block_info(block.key().transpose()) else {
                continue;
            };
            let target = tinfo.index();
            let bdist = StaticDist::new(block.lenb(), nranks);
            for dest in 0..nranks {
                let (bstart, bend) = bdist.range(dest);
                let mut chunk = Vec::with_capacity(block.asize() * (bend - bstart));
                for row in block.data().chunks(block.lenb()) {
                    chunk.extend_from_slice(&row[bstart..bend]);
                }
                if dest == me {
                    buf.push((target, chunk));
                } else {
                    let tag = Tag::Transpose((target * nranks + me) as u64);
                    self.comm.isend(chunk, dest, tag);
                }
            }
            for source in (0..nranks).filter(|&r| r != me) {
                let tag = Tag::Transpose((target * nranks + source) as u64);
                pending.push(PendingShard {
                    block: target,
                    source,
                    handle: self.comm.irecv(source, tag),
                });
            }
        }

        PendingTranspose { out, buf, pending }
    }

    /// Writes the piece of transposed block `block` sent by `source`
    fn place_shard(&mut self, block: usize, source: usize, chunk: &[T]) {
        let nranks = self.comm.size();
        let Some(target) = self.blocks[block].as_mut() else {
            panic!("transposed shard for null block {}", block);
        };
        // columns of the target shard are the source block's alpha strings
        let (astart, aend) = StaticDist::new(target.lenb(), nranks).range(source);
        let bsize = target.asize();
        assert_eq!(
            chunk.len(),
            (aend - astart) * bsize,
            "transposed shard from rank {} has the wrong size",
            source
        );
        if chunk.is_empty() {
            return;
        }
        let piece = DMatrixView::from_slice(chunk, bsize, aend - astart);
        target
            .as_matrix_mut()
            .view_mut((astart, 0), (aend - astart, bsize))
            .tr_copy_from(&piece);
    }

    /// All determinants held by this rank
    fn local_determinants(&self) -> Vec<Determinant<T>> {
        let mut found = Vec::with_capacity(self.local_size());
        for block in self.blocks() {
            let aclass = self.space.stringsa().class(block.info().alpha_class());
            let bclass = self.space.stringsb().class(block.info().beta_class());
            for ia in block.astart()..block.aend() {
                let abits = aclass.string(ia);
                for (&value, &bbits) in block.row(ia).iter().zip(bclass.strings()) {
                    found.push(Determinant {
                        abits,
                        bbits,
                        value,
                    });
                }
            }
        }
        found
    }
}

struct PendingShard {
    block: usize,
    source: usize,
    handle: RecvHandle,
}

/// Transpose in flight.
///
/// Pending transposes have to be completed in the order they were started.
pub struct PendingTranspose<T: Amplitude> {
    out: DistCiVector<T>,
    buf: Vec<(usize, Vec<T>)>,
    pending: Vec<PendingShard>,
}

impl<T: Amplitude> PendingTranspose<T> {
    /// Receives every outstanding piece and returns the transposed vector
    pub fn transpose_wait(self) -> DistCiVector<T> {
        let PendingTranspose {
            mut out,
            buf,
            pending,
        } = self;
        let me = out.comm.rank();
        for (block, chunk) in buf {
            out.place_shard(block, me, &chunk);
        }
        for shard in pending {
            let chunk: Vec<T> = out.comm.wait(shard.handle);
            out.place_shard(shard.block, shard.source, &chunk);
        }
        out
    }
}

impl<T: Amplitude> CiVectorOps for DistCiVector<T> {
    type Elem = T;

    fn space(&self) -> &Arc<DeterminantSpace> {
        &self.space
    }

    fn zeros_in(&self, space: Arc<DeterminantSpace>) -> Self {
        DistCiVector::new(space, self.comm.clone())
    }

    fn zero(&mut self) {
        for block in self.blocks.iter_mut().flatten() {
            block.zero();
        }
    }

    fn global_size(&self) -> usize {
        self.global_size
    }

    fn dot_product(&self, other: &Self) -> T {
        assert!(
            self.space.is_compatible(&other.space),
            "dot product of vectors over incompatible spaces"
        );
        let mut sum = [T::lift(0.0)];
        for block in self.blocks() {
            let Some(oblock) = self.matching(other, block) else {
                continue;
            };
            for (&a, &b) in block.data().iter().zip(oblock.data()) {
                sum[0] += a.conj_mul(b);
            }
        }
        self.comm.allreduce_sum(&mut sum);
        sum[0]
    }

    fn scale(&mut self, a: T) {
        for block in self.blocks.iter_mut().flatten() {
            block.data_mut().par_iter_mut().for_each(|x| *x *= a);
        }
    }

    fn ax_plus_y(&mut self, a: T, x: &Self) {
        assert!(
            self.space.is_compatible(&x.space),
            "ax_plus_y of vectors over incompatible spaces"
        );
        for index in 0..self.blocks.len() {
            let Some(block) = self.blocks[index].as_ref() else {
                continue;
            };
            let Some(source) = self.matching(x, block) else {
                continue;
            };
            if let Some(block) = self.blocks[index].as_mut() {
                block
                    .data_mut()
                    .par_iter_mut()
                    .zip(source.data().par_iter())
                    .for_each(|(y, &x)| *y += a * x);
            }
        }
    }

    fn apply(&self, orbital: usize, action: Action, spin: Spin) -> Self {
        if spin == Spin::Alpha {
            // alpha operators act as beta operators on the transposed vector
            let swapped = DistCiVector::transpose(self).transpose_wait();
            let mut result = swapped.apply(orbital, action, Spin::Beta);
            if self.space.neleb() % 2 == 1 {
                result.scale(T::lift(-1.0));
            }
            return DistCiVector::transpose(&result).transpose_wait();
        }

        let target = target_space(&self.space, orbital, action, spin);
        let mut out = DistCiVector::new(target.clone(), self.comm.clone());
        for route in block_routes(&self.space, &target, orbital, action, spin) {
            let (Some(source), Some(dest)) = (
                self.blocks[route.source.index()].as_ref(),
                out.blocks[route.target.index()].as_mut(),
            ) else {
                continue;
            };
            for ia in source.astart()..source.aend() {
                let srow = source.row(ia);
                let drow = dest.row_mut(ia);
                for (ib, entry) in route.map.iter().enumerate() {
                    if let Some((tb, sign)) = *entry {
                        drow[tb] += srow[ib].scale(sign);
                    }
                }
            }
        }
        out
    }

    fn transpose(&self) -> Self {
        DistCiVector::transpose(self).transpose_wait()
    }

    fn fill_with<F>(&mut self, f: F)
    where
        F: Fn(u64, u64) -> T + Sync,
    {
        let space = self.space.clone();
        for block in self.blocks.iter_mut().flatten() {
            let aclass = space.stringsa().class(block.info().alpha_class());
            let bclass = space.stringsb().class(block.info().beta_class());
            let (astart, lenb) = (block.astart(), block.lenb());
            block
                .data_mut()
                .par_chunks_mut(lenb)
                .enumerate()
                .for_each(|(i, row)| {
                    let abits = aclass.string(astart + i);
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
            *self.space == *a.space && *self.space == *b.space,
            "zip_map needs vectors over one space"
        );
        let blocks = self.blocks.iter_mut().zip(&a.blocks).zip(&b.blocks);
        for ((x, p), q) in blocks {
            if let (Some(x), Some(p), Some(q)) = (x.as_mut(), p.as_ref(), q.as_ref()) {
                x.data_mut()
                    .par_iter_mut()
                    .zip(p.data().par_iter())
                    .zip(q.data().par_iter())
                    .for_each(|((x, &p), &q)| *x = f(*x, p, q));
            }
        }
    }

    fn set_determinant(&mut self, abits: u64, bbits: u64, value: T) {
        let Some((block, ia, ib)) = self.space.locate(abits, bbits) else {
            panic!("determinant {:#b}/{:#b} is outside the space", abits, bbits);
        };
        if let Some(block) = self.blocks[block].as_mut() {
            if block.owns(ia) {
                block.set(ia, ib, value);
            }
        }
    }

    fn lowest_elements(&self, n: usize) -> Vec<Determinant<T>> {
        let mut local = self.local_determinants();
        local.sort_by(by_value);
        local.truncate(n);
        let mut all: Vec<_> = self.comm.allgather(local).into_iter().flatten().collect();
        all.sort_by(by_value);
        all.truncate(n);
        all
    }

    fn significant_elements(&self, threshold: f64) -> Vec<Determinant<T>> {
        let local: Vec<_> = self
            .local_determinants()
            .into_iter()
            .filter(|d| d.value.modulus() >= threshold)
            .collect();
        let mut all: Vec<_> = self.comm.allgather(local).into_iter().flatten().collect();
        all.sort_by(by_magnitude);
        all
    }

    fn print(&self, threshold: f64) {
        let lines = self.format_amplitudes(threshold);
        if self.comm.is_root() {
            for line in lines {
                info!("{}", line);
            }
        }
    }
}
