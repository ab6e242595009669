//! In-process transport: every rank is a thread, messages travel over
//! unbounded channels.

use color_eyre::eyre::{eyre, Result};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use super::communicator::{Communicator, Envelope, Payload, Tag, Transport};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct ChannelTransport {
    rank: usize,
    peers: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    // arrived but not yet matched, in arrival order
    mailbox: Mutex<VecDeque<Envelope>>,
    aborted: Arc<AtomicBool>,
}

impl ChannelTransport {
    /// Transport of a world with a single rank
    pub fn serial() -> Self {
        let (tx, rx) = unbounded();
        ChannelTransport {
            rank: 0,
            peers: vec![tx],
            inbox: rx,
            mailbox: Mutex::new(VecDeque::new()),
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Connected transports for `nranks` ranks
    pub fn world(nranks: usize, aborted: Arc<AtomicBool>) -> Vec<ChannelTransport> {
        assert!(nranks > 0, "a world needs at least one rank");
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..nranks).map(|_| unbounded()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| ChannelTransport {
                rank,
                peers: senders.clone(),
                inbox,
                mailbox: Mutex::new(VecDeque::new()),
                aborted: aborted.clone(),
            })
            .collect()
    }

    fn take_from_mailbox(&self, source: Option<usize>, tag: Tag) -> Option<Envelope> {
        let mut mailbox = self.mailbox.lock().unwrap_or_else(PoisonError::into_inner);
        mailbox.extend(self.inbox.try_iter());
        let position = mailbox.iter().position(|e| e.matches(source, tag))?;
        mailbox.remove(position)
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn post(&self, dest: usize, tag: Tag, payload: Payload) {
        let envelope = Envelope {
            source: self.rank,
            tag,
            payload,
        };
        if self.peers[dest].send(envelope).is_err() {
            warn!("Rank {} dropped a {:?} message to finished rank {}", self.rank, tag, dest);
        }
    }

    fn try_take(&self, source: Option<usize>, tag: Tag) -> Option<Envelope> {
        self.take_from_mailbox(source, tag)
    }

    fn take(&self, source: Option<usize>, tag: Tag) -> Envelope {
        loop {
            if let Some(envelope) = self.take_from_mailbox(source, tag) {
                return envelope;
            }
            if self.aborted.load(Ordering::SeqCst) {
                panic!("rank {}: a peer rank aborted while waiting for {:?}", self.rank, tag);
            }
            match self.inbox.recv_timeout(POLL_INTERVAL) {
                Ok(envelope) => self
                    .mailbox
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push_back(envelope),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    panic!("rank {}: every peer disconnected", self.rank)
                }
            }
        }
    }
}

/// Marks the world aborted when its rank unwinds
struct AbortGuard(Arc<AtomicBool>);

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(true, Ordering::SeqCst);
        }
    }
}

/// Runs `f` on `nranks` ranks, one scoped thread each, and returns every
/// rank's result in rank order.
///
/// A panic on one rank aborts the others as soon as they wait for a message.
pub fn run_ranks<R, F>(nranks: usize, f: F) -> Result<Vec<R>>
where
    R: Send,
    F: Fn(Communicator) -> R + Sync,
{
    let aborted = Arc::new(AtomicBool::new(false));
    let transports = ChannelTransport::world(nranks, aborted.clone());
    debug!("Starting {} ranks", nranks);

    let joined = crossbeam::thread::scope(|s| {
        let handles: Vec<_> = transports
            .into_iter()
            .map(|transport| {
                let f = &f;
                let guard = AbortGuard(aborted.clone());
                s.spawn(move |_| {
                    let _guard = guard;
                    f(Communicator::new(Arc::new(transport)))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
    })
    .map_err(|_| eyre!("rank threads could not be joined"))?;

    joined
        .into_iter()
        .enumerate()
        .map(|(rank, result)| result.map_err(|_| eyre!("rank {} aborted", rank)))
        .collect()
}
