//! Message passing between ranks
//!
//! Ranks are threads of one process. Each rank owns a [`Communicator`] with
//! buffered point-to-point messages matched by (source, tag) and the usual
//! collectives. Messages between a pair of ranks never overtake each other.

mod communicator;
mod request;
mod transport;
#[cfg(test)]
mod tests;

pub use communicator::{Communicator, Envelope, Payload, RecvHandle, Tag, Transport};
pub use request::{BufferPutRequest, ReceivedRows, RecvRequest, RequestId};
pub use transport::{run_ranks, ChannelTransport};
