/*! Seed-node directory client.

Refreshes the service-node list over JSON-RPC. Seeds are tried in order;
the first one that answers with a parseable directory wins. The whole list
is retried a bounded number of rounds with a pause in between before the
refresh is given up.
*/

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lsrpc_packet::service_node::ServiceNode;

use crate::config::ClientConfig;

/// Rounds across the seed list before giving up.
const MAX_ROUNDS: usize = 5;

/// Pause between rounds.
const ROUND_BACKOFF: Duration = Duration::from_secs(10);

/// Error that can happen when refreshing the service-node list.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum DirectoryError {
    /// Seed could not be reached.
    #[error("Seed could not be reached: {0}")]
    Connect(String),
    /// Seed answered with a non-success HTTP status.
    #[error("Seed answered with HTTP status {0}")]
    HttpStatus(u16),
    /// Seed response is not a valid directory document.
    #[error("Seed response is not a valid directory document")]
    Parse,
    /// Seed request timed out.
    #[error("Seed request timed out")]
    Timeout,
    /// Every seed failed in every round.
    #[error("Every seed failed in every round")]
    Exhausted,
}

#[derive(Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: u32,
    method: &'static str,
    params: RpcParams,
}

#[derive(Serialize)]
struct RpcParams {
    limit: u32,
    fields: RpcFields,
}

#[derive(Serialize)]
struct RpcFields {
    public_ip: bool,
    storage_port: bool,
    pubkey_x25519: bool,
    pubkey_ed25519: bool,
    storage_lmq_port: bool,
    swarm_id: bool,
}

impl RpcRequest {
    fn get_n_service_nodes(limit: u32) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0",
            id: 0,
            method: "get_n_service_nodes",
            params: RpcParams {
                limit,
                fields: RpcFields {
                    public_ip: true,
                    storage_port: true,
                    pubkey_x25519: true,
                    pubkey_ed25519: true,
                    storage_lmq_port: true,
                    swarm_id: true,
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct RpcResponse {
    result: DirectoryResult,
}

#[derive(Deserialize)]
struct DirectoryResult {
    service_node_states: Vec<ServiceNode>,
}

/// Client for the seed-node JSON-RPC directory.
pub struct DirectoryClient {
    seeds: Vec<String>,
    client: reqwest::Client,
    rounds: usize,
    backoff: Duration,
}

impl DirectoryClient {
    /// Create a client over the seeds and timeouts in `config`.
    pub fn new(config: &ClientConfig) -> DirectoryClient {
        DirectoryClient::with_seeds(config, config.seed_nodes.clone())
    }

    /// Create a client over an explicit seed list.
    pub fn with_seeds(config: &ClientConfig, seeds: Vec<String>) -> DirectoryClient {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.tls_verify)
            .build()
            .expect("failed to build HTTP client");
        DirectoryClient {
            seeds,
            client,
            rounds: MAX_ROUNDS,
            backoff: ROUND_BACKOFF,
        }
    }

    /// Fetch up to `limit` service nodes, trying seeds in order and
    /// returning the first successful answer.
    pub async fn fetch(&self, limit: u32) -> Result<Vec<ServiceNode>, DirectoryError> {
        for round in 0..self.rounds {
            if round > 0 {
                debug!("directory round {} of {}", round + 1, self.rounds);
                tokio::time::sleep(self.backoff).await;
            }
            for seed in &self.seeds {
                match self.fetch_from(seed, limit).await {
                    Ok(nodes) => {
                        debug!("seed '{}' answered with {} nodes", seed, nodes.len());
                        return Ok(nodes);
                    }
                    Err(error) => warn!("seed '{}' failed: {}", seed, error),
                }
            }
        }
        Err(DirectoryError::Exhausted)
    }

    async fn fetch_from(&self, seed: &str, limit: u32) -> Result<Vec<ServiceNode>, DirectoryError> {
        let response = self
            .client
            .post(seed)
            .json(&RpcRequest::get_n_service_nodes(limit))
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    DirectoryError::Timeout
                } else {
                    DirectoryError::Connect(error.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::HttpStatus(status.as_u16()));
        }

        let document: RpcResponse = response.json().await.map_err(|_| DirectoryError::Parse)?;
        Ok(document.result.service_node_states)
    }
}
