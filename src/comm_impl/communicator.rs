//! Point-to-point messaging and collectives between ranks
//!
//! Collectives are numbered per rank; every rank must call the same sequence
//! of collectives, otherwise the ranks wait on different sequence numbers and
//! the run hangs.

use std::any::Any;
use std::ops::AddAssign;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::transport::ChannelTransport;

/// Type-erased message body; always a `Vec<T>`
pub type Payload = Box<dyn Any + Send>;

/// Message tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// User point-to-point tag
    Point(u64),
    /// Sequence number of a collective operation
    Collective(u64),
    /// Request for a beta row owned by the receiver
    RowRequest,
    /// Reply to a row request, tagged by the global alpha index
    Row(u64),
    /// Shard exchanged by a transpose, `block index * nranks + source rank`
    Transpose(u64),
}

pub struct Envelope {
    pub source: usize,
    pub tag: Tag,
    pub payload: Payload,
}

impl Envelope {
    pub fn matches(&self, source: Option<usize>, tag: Tag) -> bool {
        self.tag == tag && source.map_or(true, |s| s == self.source)
    }

    /// Unpacks the `Vec<T>` carried by the message
    pub fn unpack<T: 'static>(self) -> Vec<T> {
        let (source, tag) = (self.source, self.tag);
        match self.payload.downcast::<Vec<T>>() {
            Ok(data) => *data,
            Err(_) => panic!(
                "message from rank {} with tag {:?} carries an unexpected payload type",
                source, tag
            ),
        }
    }
}

/// Delivery of messages between ranks
pub trait Transport: Send + Sync {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    /// Buffered send; returns once the message is queued
    fn post(&self, dest: usize, tag: Tag, payload: Payload);
    /// Oldest matching message, if one has arrived
    fn try_take(&self, source: Option<usize>, tag: Tag) -> Option<Envelope>;
    /// Blocks until a matching message arrives
    fn take(&self, source: Option<usize>, tag: Tag) -> Envelope;
}

/// Handle of a posted receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvHandle {
    source: usize,
    tag: Tag,
}

impl RecvHandle {
    pub fn source(&self) -> usize {
        self.source
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }
}

/// Communicator of one rank
#[derive(Clone)]
pub struct Communicator {
    transport: Arc<dyn Transport>,
    sequence: Arc<AtomicU64>,
}

impl Communicator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Communicator {
            transport,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Single-rank communicator
    pub fn serial() -> Self {
        Communicator::new(Arc::new(ChannelTransport::serial()))
    }

    pub fn rank(&self) -> usize {
        self.transport.rank()
    }

    pub fn size(&self) -> usize {
        self.transport.size()
    }

    pub fn is_root(&self) -> bool {
        self.rank() == 0
    }

    /// Non-blocking send. Messages are buffered, so the send is complete on return.
    pub fn isend<T: Send + 'static>(&self, data: Vec<T>, dest: usize, tag: Tag) {
        self.transport.post(dest, tag, Box::new(data));
    }

    /// Posts a receive; complete it with [`Communicator::test`] or [`Communicator::wait`]
    pub fn irecv(&self, source: usize, tag: Tag) -> RecvHandle {
        RecvHandle { source, tag }
    }

    pub fn test<T: 'static>(&self, handle: &RecvHandle) -> Option<Vec<T>> {
        self.transport
            .try_take(Some(handle.source), handle.tag)
            .map(Envelope::unpack)
    }

    pub fn wait<T: 'static>(&self, handle: RecvHandle) -> Vec<T> {
        self.transport.take(Some(handle.source), handle.tag).unpack()
    }

    /// Oldest message with `tag` from any rank
    pub fn try_recv_any<T: 'static>(&self, tag: Tag) -> Option<(usize, Vec<T>)> {
        self.transport.try_take(None, tag).map(|envelope| {
            let source = envelope.source;
            (source, envelope.unpack())
        })
    }

    fn next_collective(&self) -> Tag {
        Tag::Collective(self.sequence.fetch_add(1, Ordering::SeqCst))
    }

    /// Contributions of every rank in rank order
    fn exchange<T: Clone + Send + 'static>(&self, local: &[T], tag: Tag) -> Vec<Vec<T>> {
        let me = self.rank();
        for dest in (0..self.size()).filter(|&r| r != me) {
            self.isend(local.to_vec(), dest, tag);
        }
        (0..self.size())
            .map(|source| {
                if source == me {
                    local.to_vec()
                } else {
                    self.transport.take(Some(source), tag).unpack()
                }
            })
            .collect()
    }

    /// Elementwise sum over all ranks.
    ///
    /// Contributions are added in rank order, so every rank ends up with
    /// bitwise identical results.
    pub fn allreduce_sum<T>(&self, buf: &mut [T])
    where
        T: Copy + AddAssign + Send + 'static,
    {
        let tag = self.next_collective();
        if self.size() == 1 {
            return;
        }
        let contributions = self.exchange(buf, tag);
        let mut total = contributions[0].clone();
        for contribution in &contributions[1..] {
            assert_eq!(contribution.len(), total.len(), "allreduce length mismatch");
            for (t, &c) in total.iter_mut().zip(contribution) {
                *t += c;
            }
        }
        buf.copy_from_slice(&total);
    }

    /// All-reduce of a progress vote; used while polling for completion
    pub fn soft_allreduce(&self, buf: &mut [usize]) {
        self.allreduce_sum(buf);
    }

    /// Every rank's contribution, in rank order
    pub fn allgather<T: Clone + Send + 'static>(&self, local: Vec<T>) -> Vec<Vec<T>> {
        let tag = self.next_collective();
        if self.size() == 1 {
            return vec![local];
        }
        self.exchange(&local, tag)
    }

    /// Replaces `buf` on every rank by the contents on `root`
    pub fn broadcast<T: Clone + Send + 'static>(&self, buf: &mut Vec<T>, root: usize) {
        assert!(root < self.size(), "broadcast root {} out of range", root);
        let tag = self.next_collective();
        if self.size() == 1 {
            return;
        }
        if self.rank() == root {
            for dest in (0..self.size()).filter(|&r| r != root) {
                self.isend(buf.clone(), dest, tag);
            }
        } else {
            *buf = self.transport.take(Some(root), tag).unpack();
        }
    }

    pub fn barrier(&self) {
        let mut token = [0usize];
        self.allreduce_sum(&mut token);
    }
}
