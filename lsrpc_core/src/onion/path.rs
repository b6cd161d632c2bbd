/*! Random onion path selection.
*/

use rand::{CryptoRng, Rng};

use lsrpc_packet::service_node::{PathHop, ServiceNode};

use super::errors::PathError;

/// Ordered hops of a single request.
#[derive(Clone, Debug)]
pub struct OnionPath {
    /// Hops from entry to terminal.
    pub hops: Vec<PathHop>,
}

impl OnionPath {
    /// Hop that receives the network request.
    pub fn entry(&self) -> &PathHop {
        &self.hops[0]
    }

    /// Hop that performs the destination HTTP call.
    pub fn terminal(&self) -> &PathHop {
        &self.hops[self.hops.len() - 1]
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// Whether the path has no hops. Selection never produces one.
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }
}

/// Pick `length` distinct hops uniformly at random from the valid
/// candidates.
///
/// Candidates are taken as provided: duplicates in the list are each
/// independently eligible. Selection is by rejection sampling on uniform
/// indices, so no index is used twice.
pub fn select_path<R>(rng: &mut R, candidates: &[ServiceNode], length: usize) -> Result<OnionPath, PathError>
where
    R: Rng + CryptoRng,
{
    if length == 0 {
        return Err(PathError::ZeroLength);
    }

    let valid: Vec<PathHop> = candidates.iter().filter_map(PathHop::from_service_node).collect();
    if valid.len() < length {
        return Err(PathError::Insufficient {
            need: length,
            got: valid.len(),
        });
    }

    let mut picked_indices = Vec::with_capacity(length);
    let mut hops = Vec::with_capacity(length);
    while hops.len() < length {
        let index = rng.gen_range(0..valid.len());
        if picked_indices.contains(&index) {
            continue;
        }
        picked_indices.push(index);
        hops.push(valid[index].clone());
    }

    Ok(OnionPath { hops })
}
