//! Halo exchange: refresh ghost entries from their owning ranks.
//!
//! Setup is a two-phase "sizes then ids" handshake, run once per entity kind:
//!
//! 1. Every rank tells every other rank how many entities it needs from it.
//! 2. Ghost ranks send the global ids they need; owners resolve the ids to
//!    local indices and remember them as their send list.
//!
//! Execute then moves only values: owners pack their send lists, ghosts
//! unpack into their receive lists. Both phases are collective and blocking.

use std::collections::{BTreeMap, HashMap};

use bytemuck::cast_slice;
use parking_lot::Mutex;

use crate::algs::communicator::{Communicator, ExchangeTags, Wait};
use crate::field::{Field, FieldData, FieldSet, FieldValue};
use crate::mesh_error::MeshError;
use crate::topology::global_id::GlobalId;
use crate::topology::ownership::Ownership;

/// Counters for one exchange plan.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangeStats {
    pub exchanges: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Precomputed send/receive lists for one entity kind (nodes or edges).
#[derive(Debug)]
pub struct HaloExchange {
    size: usize,
    /// `peer -> local indices whose values we send to peer`.
    send: BTreeMap<usize, Vec<usize>>,
    /// `peer -> local ghost indices we fill from peer`.
    recv: BTreeMap<usize, Vec<usize>>,
    tags: ExchangeTags,
    stats: Mutex<ExchangeStats>,
}

fn take_bytes(peer: usize, raw: Option<Vec<u8>>, expected: usize) -> Result<Vec<u8>, MeshError> {
    let raw = raw.ok_or_else(|| MeshError::CommError {
        neighbor: peer,
        message: "no data received".into(),
    })?;
    if raw.len() != expected {
        return Err(MeshError::CommError {
            neighbor: peer,
            message: format!("expected {expected} bytes, received {}", raw.len()),
        });
    }
    Ok(raw)
}

impl HaloExchange {
    /// Build the exchange plan. Collective over `comm`.
    ///
    /// # Errors
    /// - [`MeshError::LengthMismatch`] if `global_ids` and `ownership` differ in length.
    /// - [`MeshError::OwnerOutOfRange`] if an owner is not a rank of `comm`.
    /// - [`MeshError::UnknownRemoteEntity`] if a peer requests an id we do not own.
    pub fn setup<C: Communicator>(
        ownership: &Ownership,
        global_ids: &[GlobalId],
        comm: &C,
        tags: ExchangeTags,
    ) -> Result<Self, MeshError> {
        if global_ids.len() != ownership.len() {
            return Err(MeshError::LengthMismatch {
                what: "global ids",
                expected: ownership.len(),
                found: global_ids.len(),
            });
        }
        let me = comm.rank();
        let size = comm.size();
        ownership.validate_owners(size)?;

        let recv = ownership.ghosts_by_owner();

        // 1) request counts, to and from every other rank
        let count_recvs: Vec<_> = (0..size)
            .filter(|&p| p != me)
            .map(|p| (p, comm.irecv(p, tags.sizes.as_u16(), 4)))
            .collect();
        let count_sends: Vec<_> = (0..size)
            .filter(|&p| p != me)
            .map(|p| {
                let n = recv.get(&p).map_or(0, Vec::len) as u32;
                comm.isend(p, tags.sizes.as_u16(), &n.to_le_bytes())
            })
            .collect();
        let mut incoming = BTreeMap::new();
        for (peer, h) in count_recvs {
            let raw = take_bytes(peer, h.wait(), 4)?;
            let n = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
            if n > 0 {
                incoming.insert(peer, n);
            }
        }
        for s in count_sends {
            s.wait();
        }

        // 2) requested global ids
        let id_recvs: Vec<_> = incoming
            .iter()
            .map(|(&p, &n)| (p, n, comm.irecv(p, tags.ids.as_u16(), n * 8)))
            .collect();
        let id_sends: Vec<_> = recv
            .iter()
            .map(|(&p, ghosts)| {
                let ids: Vec<u64> = ghosts.iter().map(|&i| global_ids[i].get()).collect();
                comm.isend(p, tags.ids.as_u16(), cast_slice(&ids))
            })
            .collect();

        let owned: HashMap<u64, usize> = ownership
            .owned_indices()
            .map(|i| (global_ids[i].get(), i))
            .collect();
        let mut send = BTreeMap::new();
        for (peer, n, h) in id_recvs {
            let raw = take_bytes(peer, h.wait(), n * 8)?;
            let ids: Vec<u64> = bytemuck::pod_collect_to_vec(&raw);
            let locals = ids
                .iter()
                .map(|&gid| {
                    owned
                        .get(&gid)
                        .copied()
                        .ok_or(MeshError::UnknownRemoteEntity {
                            rank: peer,
                            global_id: gid,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            send.insert(peer, locals);
        }
        for s in id_sends {
            s.wait();
        }

        log::debug!(
            "rank {me}: halo plan sends to {:?}, receives from {:?}",
            send.iter().map(|(p, v)| (*p, v.len())).collect::<Vec<_>>(),
            recv.iter().map(|(p, v)| (*p, v.len())).collect::<Vec<_>>(),
        );

        Ok(Self {
            size: ownership.len(),
            send,
            recv,
            tags,
            stats: Mutex::new(ExchangeStats::default()),
        })
    }

    /// Number of local entities this plan covers.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn nb_ghosts(&self) -> usize {
        self.recv.values().map(Vec::len).sum()
    }

    pub fn neighbours(&self) -> impl Iterator<Item = usize> + '_ {
        let mut peers: Vec<usize> = self.send.keys().chain(self.recv.keys()).copied().collect();
        peers.sort_unstable();
        peers.dedup();
        peers.into_iter()
    }

    pub fn stats(&self) -> ExchangeStats {
        *self.stats.lock()
    }

    /// Exchange a raw entity-major buffer with `stride` values per entity.
    pub fn execute_values<V, C>(&self, values: &mut [V], stride: usize, comm: &C) -> Result<(), MeshError>
    where
        V: FieldValue,
        C: Communicator,
    {
        if values.len() != self.size * stride {
            return Err(MeshError::LengthMismatch {
                what: "halo exchange buffer",
                expected: self.size * stride,
                found: values.len(),
            });
        }
        let tag = self.tags.data.as_u16();
        let width = stride * std::mem::size_of::<V>();

        let recvs: Vec<_> = self
            .recv
            .iter()
            .map(|(&p, ghosts)| (p, ghosts, comm.irecv(p, tag, ghosts.len() * width)))
            .collect();

        let mut sent = 0u64;
        let mut sends = Vec::with_capacity(self.send.len());
        for (&peer, locals) in &self.send {
            let mut buf: Vec<V> = Vec::with_capacity(locals.len() * stride);
            for &i in locals {
                buf.extend_from_slice(&values[i * stride..(i + 1) * stride]);
            }
            let bytes: &[u8] = cast_slice(&buf);
            sent += bytes.len() as u64;
            sends.push(comm.isend(peer, tag, bytes));
        }

        // Validate every message before touching ghost slots.
        let mut arrived = Vec::with_capacity(recvs.len());
        for (peer, ghosts, h) in recvs {
            let raw = take_bytes(peer, h.wait(), ghosts.len() * width)?;
            arrived.push((ghosts, bytemuck::pod_collect_to_vec::<u8, V>(&raw)));
        }
        for s in sends {
            s.wait();
        }

        let mut received = 0u64;
        for (ghosts, incoming) in arrived {
            received += (incoming.len() * std::mem::size_of::<V>()) as u64;
            for (&g, chunk) in ghosts.iter().zip(incoming.chunks_exact(stride.max(1))) {
                values[g * stride..(g + 1) * stride].copy_from_slice(chunk);
            }
        }

        let mut stats = self.stats.lock();
        stats.exchanges += 1;
        stats.bytes_sent += sent;
        stats.bytes_received += received;
        Ok(())
    }

    /// Refresh all ghost entries of `field` and clear its dirty flag.
    ///
    /// # Errors
    /// [`MeshError::SizeMismatch`] if the field does not span this plan's entities.
    pub fn execute<C: Communicator>(&self, field: &mut Field, comm: &C) -> Result<(), MeshError> {
        field.expect_size(self.size)?;
        let stride = field.shape().stride();
        match field.data_mut() {
            FieldData::F32(v) => self.execute_values(v, stride, comm)?,
            FieldData::F64(v) => self.execute_values(v, stride, comm)?,
            FieldData::I32(v) => self.execute_values(v, stride, comm)?,
            FieldData::I64(v) => self.execute_values(v, stride, comm)?,
        }
        field.set_dirty(false);
        Ok(())
    }

    /// Exchange every field of a set, in set order.
    pub fn execute_set<C: Communicator>(&self, fields: &mut FieldSet, comm: &C) -> Result<(), MeshError> {
        for field in fields.iter() {
            field.expect_size(self.size)?;
        }
        for field in fields.iter_mut() {
            self.execute(field, comm)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{CommTag, NoComm, RayonComm};
    use crate::field::FieldLocation;
    use serial_test::serial;

    fn gids(raw: &[u64]) -> Vec<GlobalId> {
        raw.iter().map(|&g| GlobalId::new(g).unwrap()).collect()
    }

    #[test]
    fn serial_plan_is_empty_and_clears_dirty() {
        let own = Ownership::all_owned(3, 0);
        let plan = HaloExchange::setup(&own, &gids(&[1, 2, 3]), &NoComm, ExchangeTags::default()).unwrap();
        assert_eq!(plan.nb_ghosts(), 0);
        let mut f = Field::scalar::<f64>("x", FieldLocation::Nodes, 3, 2);
        assert!(f.is_dirty());
        plan.execute(&mut f, &NoComm).unwrap();
        assert!(!f.is_dirty());
        assert_eq!(plan.stats().exchanges, 1);
    }

    #[test]
    fn wrong_size_is_rejected_before_exchange() {
        let own = Ownership::all_owned(3, 0);
        let plan = HaloExchange::setup(&own, &gids(&[1, 2, 3]), &NoComm, ExchangeTags::default()).unwrap();
        let mut f = Field::scalar::<f64>("x", FieldLocation::Nodes, 4, 1);
        assert!(matches!(plan.execute(&mut f, &NoComm), Err(MeshError::SizeMismatch { .. })));
        assert!(f.is_dirty());
    }

    // Two ranks share global ids 2 and 3. Rank 0 owns 1,2; rank 1 owns 3,4.
    #[test]
    #[serial]
    fn two_rank_exchange_fills_ghosts() {
        let world = RayonComm::world(2);
        let handles: Vec<_> = world
            .into_iter()
            .map(|comm| {
                std::thread::spawn(move || {
                    let (ids, owners) = if comm.rank() == 0 {
                        (gids(&[1, 2, 3]), vec![0, 0, 1])
                    } else {
                        (gids(&[2, 3, 4]), vec![0, 1, 1])
                    };
                    let own = Ownership::from_owners(&owners, comm.rank());
                    let tags = ExchangeTags::from_base(CommTag::new(0x100));
                    let plan = HaloExchange::setup(&own, &ids, &comm, tags).unwrap();
                    let mut f = Field::vector::<f32>("v", FieldLocation::Nodes, 3, 1, 2);
                    {
                        let vals = f.values_mut::<f32>().unwrap();
                        for i in own.owned_indices().collect::<Vec<_>>() {
                            let g = ids[i].get() as f32;
                            vals[2 * i] = g;
                            vals[2 * i + 1] = -g;
                        }
                    }
                    plan.execute(&mut f, &comm).unwrap();
                    (comm.rank(), f.values::<f32>().unwrap().to_vec(), plan.stats())
                })
            })
            .collect();
        for h in handles {
            let (rank, vals, stats) = h.join().unwrap();
            if rank == 0 {
                assert_eq!(vals, vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
            } else {
                assert_eq!(vals, vec![2.0, -2.0, 3.0, -3.0, 4.0, -4.0]);
            }
            assert_eq!(stats.bytes_sent, 8);
            assert_eq!(stats.bytes_received, 8);
        }
    }

    #[test]
    #[serial]
    fn unknown_request_is_reported() {
        let world = RayonComm::world(2);
        let handles: Vec<_> = world
            .into_iter()
            .map(|comm| {
                std::thread::spawn(move || {
                    // Rank 1 believes rank 0 owns id 9, which rank 0 has never seen.
                    let (ids, owners) = if comm.rank() == 0 {
                        (gids(&[1]), vec![0])
                    } else {
                        (gids(&[9]), vec![0])
                    };
                    let own = Ownership::from_owners(&owners, comm.rank());
                    HaloExchange::setup(&own, &ids, &comm, ExchangeTags::from_base(CommTag::new(0x200)))
                        .map(|_| ())
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(
            results[0],
            Err(MeshError::UnknownRemoteEntity {
                rank: 1,
                global_id: 9
            })
        );
        assert!(results[1].is_ok());
    }
}
