//! Batched-id driver
//!
//! Methods taking id lists (`user_ids=1,2,3`) are limited by URL length.
//! `chunk_ids` splits the list so each comma-joined, URL-encoded chunk fits
//! the configured budget, and `call_batched` issues one call per chunk,
//! strictly in order.

use serde_json::Value;
use tracing::debug;

use crate::client::ApiClient;
use crate::constants::ENCODED_SEPARATOR_LEN;
use crate::error::{Error, Result};
use crate::params::CallParameters;

fn encoded_len(id: u64) -> usize {
    id.checked_ilog10().map_or(1, |digits| digits as usize + 1)
}

/// Split `ids` into consecutive chunks whose encoded form fits in `budget`.
///
/// Each id costs its digit count, plus 3 for the `%2C` separator when it is
/// not first in its chunk. An id longer than the budget still gets a chunk
/// of its own.
pub fn chunk_ids(ids: &[u64], budget: usize) -> Vec<&[u64]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut used = 0;

    for (index, &id) in ids.iter().enumerate() {
        let cost = if index == start {
            encoded_len(id)
        } else {
            encoded_len(id) + ENCODED_SEPARATOR_LEN
        };
        if index > start && used + cost > budget {
            chunks.push(&ids[start..index]);
            start = index;
            used = encoded_len(id);
        } else {
            used += cost;
        }
    }
    if start < ids.len() {
        chunks.push(&ids[start..]);
    }
    chunks
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl ApiClient {
    /// Call `method` once per chunk of `ids`, passed as parameter `id_param`.
    ///
    /// `on_chunk` receives each chunk's response before the next chunk is
    /// requested. Resolves `Ok(())` after the last chunk; the first failing
    /// chunk aborts the rest. An empty id list issues no call.
    pub async fn call_batched<F>(
        &self,
        method: &str,
        params: &CallParameters,
        id_param: &str,
        ids: &[u64],
        mut on_chunk: F,
    ) -> Result<()>
    where
        F: FnMut(Value),
    {
        let chunks = chunk_ids(ids, self.config.id_list_budget);
        let total = chunks.len();
        let mut params = params.clone();

        for (index, chunk) in chunks.into_iter().enumerate() {
            if index > 0 && self.connection.is_closing() {
                return Err(Error::Closing);
            }
            params.set(id_param, join_ids(chunk));
            debug!(method, chunk = index + 1, total, ids = chunk.len(), "requesting id chunk");

            let response = self.call(method, &params).await?;
            on_chunk(response);
        }
        Ok(())
    }
}
