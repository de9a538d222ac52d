//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are contiguous byte slices. Sends and receives return waitable
//! handles; callers post all receives, issue their sends, then `wait` on
//! everything before trusting a buffer. Between a given pair of ranks,
//! messages with the same tag are delivered in the order they were sent.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;

/// Message tag. Distinct communication epochs use distinct tags.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CommTag(u16);

impl CommTag {
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    pub const fn offset(self, by: u16) -> Self {
        Self(self.0.wrapping_add(by))
    }
}

/// Tags for the three phases of a halo exchange.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExchangeTags {
    /// Request counts during setup.
    pub sizes: CommTag,
    /// Requested global ids during setup.
    pub ids: CommTag,
    /// Field values during execute.
    pub data: CommTag,
}

impl ExchangeTags {
    pub const fn from_base(base: CommTag) -> Self {
        Self {
            sizes: base,
            ids: base.offset(1),
            data: base.offset(2),
        }
    }
}

impl Default for ExchangeTags {
    fn default() -> Self {
        Self::from_base(CommTag::new(0xA71A))
    }
}

/// Non-blocking point-to-point messaging between partition ranks.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of `len` bytes from `peer`. The completed message is
    /// returned whole; callers check its length against `len`.
    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Self::RecvHandle;

    /// Block until every rank reaches the barrier. Serial backends return at once.
    fn barrier(&self) {}
}

impl<C: Communicator + ?Sized> Communicator for &C {
    type SendHandle = C::SendHandle;
    type RecvHandle = C::RecvHandle;

    fn rank(&self) -> usize {
        (**self).rank()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        (**self).isend(peer, tag, buf)
    }

    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Self::RecvHandle {
        (**self).irecv(peer, tag, len)
    }

    fn barrier(&self) {
        (**self).barrier()
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Single-rank communicator for serial runs.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}

    fn irecv(&self, _peer: usize, _tag: u16, _len: usize) {}
}

// --- RayonComm: ranks as threads of one process ---
type Key = (usize, usize, u16); // (src, dst, tag)
type Mailbox = Arc<DashMap<Key, VecDeque<Bytes>>>;

/// Pending receive on a [`RayonComm`] mailbox.
pub struct LocalHandle {
    key: Key,
    mailbox: Mailbox,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            let popped = self
                .mailbox
                .get_mut(&self.key)
                .and_then(|mut queue| queue.pop_front());
            if let Some(bytes) = popped {
                return Some(bytes.to_vec());
            }
            std::thread::yield_now();
        }
    }
}

/// In-process communicator: each rank runs on its own thread and all ranks of
/// one world share a mailbox.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Mailbox,
}

impl RayonComm {
    /// Create the communicators of a `size`-rank world, one per rank.
    pub fn world(size: usize) -> Vec<RayonComm> {
        let mailbox: Mailbox = Arc::new(DashMap::new());
        (0..size)
            .map(|rank| RayonComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
        let key = (self.rank, peer, tag);
        self.mailbox
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, _len: usize) -> LocalHandle {
        LocalHandle {
            key: (peer, self.rank, tag),
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::environment::Universe;
    use mpi::request::{Request, StaticScope};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// Communicator over `MPI_COMM_WORLD`.
    pub struct MpiComm {
        // Dropping the universe finalizes MPI.
        _universe: Universe,
        pub world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        /// Initialise MPI; `None` if it was already initialised.
        pub fn new() -> Option<Self> {
            let universe = mpi::initialize()?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Some(Self {
                _universe: universe,
                world,
                rank,
                size,
            })
        }
    }

    /// In-flight send; owns its buffer until the request completes.
    pub struct MpiSendHandle {
        request: Option<Request<'static, [u8], StaticScope>>,
        buffer: *mut [u8],
    }

    impl Wait for MpiSendHandle {
        fn wait(mut self) -> Option<Vec<u8>> {
            if let Some(request) = self.request.take() {
                request.wait();
            }
            // SAFETY: `buffer` came from `Box::into_raw` in `isend` and the
            // request borrowing it has completed.
            drop(unsafe { Box::from_raw(self.buffer) });
            None
        }
    }

    /// Receive performed when waited on; sends are already in flight.
    pub struct MpiRecvHandle {
        peer: i32,
        tag: i32,
    }

    impl Wait for MpiRecvHandle {
        fn wait(self) -> Option<Vec<u8>> {
            let world = SimpleCommunicator::world();
            let (data, _status) = world
                .process_at_rank(self.peer)
                .receive_vec_with_tag::<u8>(self.tag);
            Some(data)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiSendHandle;
        type RecvHandle = MpiRecvHandle;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiSendHandle {
            let raw: *mut [u8] = Box::into_raw(buf.to_vec().into_boxed_slice());
            // SAFETY: the boxed buffer lives until `MpiSendHandle::wait` frees it.
            let data: &'static [u8] = unsafe { &*raw };
            let request = self.world.process_at_rank(peer as i32).immediate_send_with_tag(
                StaticScope,
                data,
                i32::from(tag),
            );
            MpiSendHandle {
                request: Some(request),
                buffer: raw,
            }
        }

        fn irecv(&self, peer: usize, tag: u16, _len: usize) -> MpiRecvHandle {
            MpiRecvHandle {
                peer: peer as i32,
                tag: i32::from(tag),
            }
        }

        fn barrier(&self) {
            self.world.barrier();
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
