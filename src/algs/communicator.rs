//! Thin façade over intra-process (Rayon) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees). Point-to-point
//! handles are waitable; the collectives the partition pipeline needs
//! ([`Communicator::all_gather_bytes`] and the typed helpers built on it) are
//! blocking and must be entered by every rank in the same order.

use crate::algs::wire::{WireCount, cast_slice, decode_words, encode_words, read_count};
use crate::mesh_error::MeshError;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::mem::size_of;
use std::sync::Arc;

/// Typed message tag. A collective uses `tag` for its size header and
/// `tag + 1` for the payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CommTag(u16);

impl CommTag {
    pub const fn new(v: u16) -> Self {
        CommTag(v)
    }
    pub const fn as_u16(self) -> u16 {
        self.0
    }
    pub const fn offset(self, k: u16) -> Self {
        CommTag(self.0.wrapping_add(k))
    }
}

/// Tags of the pipeline's collective phases.
pub mod tags {
    use super::CommTag;

    pub const PREFLIGHT: CommTag = CommTag::new(0x1000);
    pub const PARTITION: CommTag = CommTag::new(0x1100);
    pub const OWNERSHIP: CommTag = CommTag::new(0x1200);
    pub const DUAL: CommTag = CommTag::new(0x1300);
}

/// Message-passing interface (minimal by design).
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Gather one byte payload from every rank, indexed by rank.
    fn all_gather_bytes(&self, tag: CommTag, local: &[u8]) -> Result<Vec<Vec<u8>>, MeshError> {
        all_gather_p2p(self, tag, local)
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

/// Gather a slice of indices from every rank.
pub fn all_gather_words<C: Communicator + ?Sized>(
    comm: &C,
    tag: CommTag,
    local: &[usize],
) -> Result<Vec<Vec<usize>>, MeshError> {
    comm.all_gather_bytes(tag, &encode_words(local))?
        .iter()
        .map(|bytes| decode_words(bytes))
        .collect()
}

/// All-gather over point-to-point messages: a size exchange followed by the
/// payload exchange. Every send handle is drained before returning, even on error.
fn all_gather_p2p<C: Communicator + ?Sized>(
    comm: &C,
    tag: CommTag,
    local: &[u8],
) -> Result<Vec<Vec<u8>>, MeshError> {
    let me = comm.rank();
    let size = comm.size();
    let peers: Vec<usize> = (0..size).filter(|&p| p != me).collect();

    // 1) size headers
    let mut size_recvs = Vec::with_capacity(peers.len());
    for &peer in &peers {
        let mut cnt = [0u8; size_of::<WireCount>()];
        size_recvs.push((peer, comm.irecv(peer, tag.as_u16(), &mut cnt)));
    }
    let header = WireCount::new(local.len());
    let mut pending_sends = Vec::with_capacity(2 * peers.len());
    for &peer in &peers {
        pending_sends.push(comm.isend(
            peer,
            tag.as_u16(),
            cast_slice(std::slice::from_ref(&header)),
        ));
    }

    let mut lens = vec![0usize; size];
    lens[me] = local.len();
    let mut maybe_err = None;
    for (peer, handle) in size_recvs {
        match handle.wait() {
            Some(data) => match read_count(&data) {
                Ok(n) => lens[peer] = n,
                Err(detail) if maybe_err.is_none() => {
                    maybe_err = Some(MeshError::CommError {
                        neighbor: peer,
                        detail,
                    });
                }
                Err(_) => {}
            },
            None if maybe_err.is_none() => {
                maybe_err = Some(MeshError::CommError {
                    neighbor: peer,
                    detail: format!("failed to receive size header from rank {peer}"),
                });
            }
            None => {}
        }
    }

    // 2) payloads; still exchanged on error so peers are not left waiting
    let payload_tag = tag.offset(1).as_u16();
    let mut payload_recvs = Vec::with_capacity(peers.len());
    for &peer in &peers {
        let mut buf = vec![0u8; lens[peer]];
        payload_recvs.push((peer, comm.irecv(peer, payload_tag, &mut buf)));
    }
    for &peer in &peers {
        pending_sends.push(comm.isend(peer, payload_tag, local));
    }

    let mut out = vec![Vec::new(); size];
    out[me] = local.to_vec();
    for (peer, handle) in payload_recvs {
        match handle.wait() {
            Some(data) if data.len() == lens[peer] => out[peer] = data,
            Some(data) if maybe_err.is_none() => {
                maybe_err = Some(MeshError::CommError {
                    neighbor: peer,
                    detail: format!("expected {} payload bytes, got {}", lens[peer], data.len()),
                });
            }
            None if maybe_err.is_none() && lens[peer] > 0 => {
                maybe_err = Some(MeshError::CommError {
                    neighbor: peer,
                    detail: format!("failed to receive payload from rank {peer}"),
                });
            }
            _ => {}
        }
    }

    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(out),
    }
}

/// Compile-time no-op comm for serial runs: one rank, nothing to exchange.
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
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- RayonComm: simulated ranks inside one process ---
type Key = (usize, usize, u16); // (src, dst, tag)

/// Per-world mailbox: FIFO queue per (src, dst, tag) plus a doorbell that
/// wakes blocked receivers whenever anything is posted.
#[derive(Default)]
struct Mailbox {
    slots: DashMap<Key, VecDeque<Bytes>>,
    bell: Mutex<u64>,
    ring: Condvar,
}

impl Mailbox {
    fn post(&self, key: Key, msg: Bytes) {
        self.slots.entry(key).or_default().push_back(msg);
        let mut rung = self.bell.lock();
        *rung += 1;
        self.ring.notify_all();
    }

    fn try_take(&self, key: &Key) -> Option<Bytes> {
        self.slots.get_mut(key).and_then(|mut queue| queue.pop_front())
    }

    fn take(&self, key: &Key) -> Bytes {
        loop {
            if let Some(msg) = self.try_take(key) {
                return msg;
            }
            let mut rung = self.bell.lock();
            if let Some(msg) = self.try_take(key) {
                return msg;
            }
            self.ring.wait(&mut rung);
        }
    }
}

pub struct LocalHandle {
    mailbox: Arc<Mailbox>,
    key: Key,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        Some(self.mailbox.take(&self.key).to_vec())
    }
}

/// One simulated rank of an in-process world.
#[derive(Clone)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl std::fmt::Debug for RayonComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayonComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl RayonComm {
    /// Create all `size` ranks of a new world sharing one mailbox.
    pub fn world(size: usize) -> Vec<RayonComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| RayonComm {
                rank,
                size,
                mailbox: mailbox.clone(),
            })
            .collect()
    }

    /// Run an SPMD closure on every rank of a fresh world, one pool thread per
    /// rank, and return the per-rank results in rank order.
    pub fn run<R, F>(size: usize, f: F) -> Result<Vec<R>, MeshError>
    where
        F: Fn(&RayonComm) -> R + Sync,
        R: Send,
    {
        if size == 0 {
            return Err(MeshError::Config("world size must be at least 1".into()));
        }
        let comms = Self::world(size);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("rank-{i}"))
            .build()
            .map_err(|e| MeshError::CommError {
                neighbor: usize::MAX,
                detail: e.to_string(),
            })?;
        Ok(pool.broadcast(|ctx| f(&comms[ctx.index()])))
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

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        self.mailbox
            .post((self.rank, peer, tag), Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            mailbox: self.mailbox.clone(),
            key: (peer, self.rank, tag),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::Count;
    use mpi::datatype::PartitionMut;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// MPI world communicator. Point-to-point handles complete eagerly;
    /// collectives map onto native MPI all-gathers.
    pub struct MpiComm {
        // dropped before `_universe`, which finalizes MPI
        pub world: SimpleCommunicator,
        rank: usize,
        size: usize,
        _universe: Universe,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, MeshError> {
            let universe = mpi::initialize().ok_or_else(|| MeshError::CommError {
                neighbor: usize::MAX,
                detail: "MPI is already initialized".into(),
            })?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                world,
                rank,
                size,
                _universe: universe,
            })
        }
    }

    pub struct MpiHandle(Option<Vec<u8>>);

    impl Wait for MpiHandle {
        fn wait(self) -> Option<Vec<u8>> {
            self.0
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiHandle;
        type RecvHandle = MpiHandle;

        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiHandle {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, tag as i32);
            MpiHandle(None)
        }

        fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> MpiHandle {
            let (data, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(tag as i32);
            MpiHandle(Some(data))
        }

        fn all_gather_bytes(
            &self,
            _tag: CommTag,
            local: &[u8],
        ) -> Result<Vec<Vec<u8>>, MeshError> {
            let my_len = Count::try_from(local.len()).map_err(|_| MeshError::CommError {
                neighbor: self.rank,
                detail: format!("payload of {} bytes exceeds MPI count range", local.len()),
            })?;
            let mut counts = vec![0 as Count; self.size];
            self.world.all_gather_into(&my_len, &mut counts[..]);
            let displs: Vec<Count> = counts
                .iter()
                .scan(0 as Count, |acc, &c| {
                    let d = *acc;
                    *acc += c;
                    Some(d)
                })
                .collect();
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            let mut buf = vec![0u8; total];
            {
                let mut partition = PartitionMut::new(&mut buf[..], &counts[..], &displs[..]);
                self.world.all_gather_varcount_into(local, &mut partition);
            }
            Ok(counts
                .iter()
                .zip(displs.iter())
                .map(|(&c, &d)| buf[d as usize..(d + c) as usize].to_vec())
                .collect())
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
