//! Bookkeeping of outstanding receives and staged sends

use std::collections::HashMap;

use super::communicator::{Communicator, RecvHandle, Tag};

pub type RequestId = usize;

/// Registry of posted receives of one session
pub struct RecvRequest<T> {
    next_id: RequestId,
    pending: Vec<(RequestId, RecvHandle)>,
    done: HashMap<RequestId, Vec<T>>,
}

impl<T: 'static> RecvRequest<T> {
    pub fn new() -> Self {
        RecvRequest {
            next_id: 0,
            pending: Vec::new(),
            done: HashMap::new(),
        }
    }

    /// Posts a receive and returns its id
    pub fn request_recv(&mut self, comm: &Communicator, source: usize, tag: Tag) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push((id, comm.irecv(source, tag)));
        id
    }

    /// Completes whatever has arrived; true when nothing is outstanding
    pub fn test(&mut self, comm: &Communicator) -> bool {
        let done = &mut self.done;
        self.pending.retain(|(id, handle)| match comm.test::<T>(handle) {
            Some(data) => {
                done.insert(*id, data);
                false
            }
            None => true,
        });
        self.pending.is_empty()
    }

    pub fn into_received(self) -> ReceivedRows<T> {
        assert!(
            self.pending.is_empty(),
            "{} receives still outstanding",
            self.pending.len()
        );
        ReceivedRows(self.done)
    }
}

impl<T: 'static> Default for RecvRequest<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct StagedWrite<T> {
    dest: usize,
    tag: Tag,
    data: Vec<T>,
}

/// Outgoing writes waiting for the next flush
pub struct BufferPutRequest<T> {
    staged: Vec<StagedWrite<T>>,
}

impl<T: Send + 'static> BufferPutRequest<T> {
    pub fn new() -> Self {
        BufferPutRequest { staged: Vec::new() }
    }

    pub fn stage(&mut self, dest: usize, tag: Tag, data: Vec<T>) {
        self.staged.push(StagedWrite { dest, tag, data });
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Sends every staged write and returns how many went out
    pub fn flush(&mut self, comm: &Communicator) -> usize {
        let count = self.staged.len();
        for write in self.staged.drain(..) {
            comm.isend(write.data, write.dest, write.tag);
        }
        count
    }
}

impl<T: Send + 'static> Default for BufferPutRequest<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Rows delivered by a finished retrieval session
#[derive(Debug)]
pub struct ReceivedRows<T>(HashMap<RequestId, Vec<T>>);

impl<T> ReceivedRows<T> {
    pub fn get(&self, id: RequestId) -> Option<&[T]> {
        self.0.get(&id).map(Vec::as_slice)
    }

    pub fn take(&mut self, id: RequestId) -> Option<Vec<T>> {
        self.0.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
