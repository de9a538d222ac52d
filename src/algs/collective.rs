//! Collective operations built from point-to-point messages.
//!
//! Every rank of the communicator must call the same collective with the same
//! tag, or the call never returns.

use bytemuck::{Pod, cast_slice};

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::mesh_error::MeshError;

fn received<T: Pod>(peer: usize, raw: Option<Vec<u8>>, count: usize) -> Result<Vec<T>, MeshError> {
    let raw = raw.ok_or_else(|| MeshError::CommError {
        neighbor: peer,
        message: "no data received".into(),
    })?;
    let expected = count * std::mem::size_of::<T>();
    if raw.len() != expected {
        return Err(MeshError::CommError {
            neighbor: peer,
            message: format!("expected {expected} bytes, received {}", raw.len()),
        });
    }
    Ok(bytemuck::pod_collect_to_vec(&raw))
}

/// Exchange one fixed-size block with every rank; result is indexed by rank.
fn all_gather_fixed<T, C>(comm: &C, tag: CommTag, local: &[T]) -> Result<Vec<Vec<T>>, MeshError>
where
    T: Pod,
    C: Communicator,
{
    let me = comm.rank();
    let n = comm.size();
    let bytes = local.len() * std::mem::size_of::<T>();
    let recvs: Vec<_> = (0..n)
        .filter(|&p| p != me)
        .map(|p| (p, comm.irecv(p, tag.as_u16(), bytes)))
        .collect();
    let sends: Vec<_> = (0..n)
        .filter(|&p| p != me)
        .map(|p| comm.isend(p, tag.as_u16(), cast_slice(local)))
        .collect();
    let mut out: Vec<Vec<T>> = vec![Vec::new(); n];
    out[me] = local.to_vec();
    for (peer, handle) in recvs {
        out[peer] = received(peer, handle.wait(), local.len())?;
    }
    for s in sends {
        s.wait();
    }
    Ok(out)
}

/// Gather a variable-length slice from every rank onto every rank.
///
/// Uses `tag` for the lengths and `tag + 1` for the payloads.
pub fn all_gather<T, C>(comm: &C, tag: CommTag, local: &[T]) -> Result<Vec<Vec<T>>, MeshError>
where
    T: Pod,
    C: Communicator,
{
    let lens = all_gather_fixed(comm, tag, &[local.len() as u64])?;
    let me = comm.rank();
    let data_tag = tag.offset(1).as_u16();
    let recvs: Vec<_> = lens
        .iter()
        .enumerate()
        .filter(|&(p, _)| p != me)
        .map(|(p, len)| {
            let count = len[0] as usize;
            (p, count, comm.irecv(p, data_tag, count * std::mem::size_of::<T>()))
        })
        .collect();
    let sends: Vec<_> = (0..comm.size())
        .filter(|&p| p != me)
        .map(|p| comm.isend(p, data_tag, cast_slice(local)))
        .collect();
    let mut out: Vec<Vec<T>> = vec![Vec::new(); comm.size()];
    out[me] = local.to_vec();
    for (peer, count, handle) in recvs {
        out[peer] = if count == 0 {
            // Empty messages may carry no payload at all.
            handle.wait();
            Vec::new()
        } else {
            received(peer, handle.wait(), count)?
        };
    }
    for s in sends {
        s.wait();
    }
    Ok(out)
}

pub fn all_reduce_max<C: Communicator>(comm: &C, tag: CommTag, value: f64) -> Result<f64, MeshError> {
    let all = all_gather_fixed(comm, tag, &[value])?;
    Ok(all.iter().map(|v| v[0]).fold(f64::NEG_INFINITY, f64::max))
}

pub fn all_reduce_min<C: Communicator>(comm: &C, tag: CommTag, value: f64) -> Result<f64, MeshError> {
    let all = all_gather_fixed(comm, tag, &[value])?;
    Ok(all.iter().map(|v| v[0]).fold(f64::INFINITY, f64::min))
}

pub fn all_reduce_sum<C: Communicator>(comm: &C, tag: CommTag, value: u64) -> Result<u64, MeshError> {
    let all = all_gather_fixed(comm, tag, &[value])?;
    Ok(all.iter().map(|v| v[0]).sum())
}
