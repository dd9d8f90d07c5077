//! Offset pagination driver
//!
//! Re-issues one method with a growing `offset` until the reported `count`
//! is reached, streaming every item to the caller. Pages are fetched strictly
//! one after another.

use serde_json::Value;
use tracing::debug;

use crate::client::ApiClient;
use crate::constants::OFFSET_PARAM;
use crate::envelope::Page;
use crate::error::{Error, Result};
use crate::params::CallParameters;

/// Whether to follow `offset` past the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    Enabled,
    SinglePage,
}

/// Loop state: the private parameter copy and the next offset.
#[derive(Debug)]
struct PageCursor {
    params: CallParameters,
    offset: u64,
    pagination: Pagination,
}

impl PageCursor {
    fn new(params: &CallParameters, pagination: Pagination) -> Self {
        Self {
            params: params.clone(),
            offset: 0,
            pagination,
        }
    }

    /// Parameters for the current page; `offset` only appears once it is non-zero.
    fn page_params(&mut self) -> &CallParameters {
        if self.offset > 0 {
            self.params.set(OFFSET_PARAM, self.offset.to_string());
        }
        &self.params
    }

    /// Move past a page. `false` when the sequence is complete.
    fn advance(&mut self, received: usize, count: u64) -> bool {
        let next_offset = self.offset + received as u64;
        if self.pagination == Pagination::SinglePage || received == 0 || next_offset >= count {
            return false;
        }
        self.offset = next_offset;
        true
    }
}

impl ApiClient {
    /// Call a paginated method, passing every item to `on_item` in order.
    ///
    /// Resolves `Ok(())` after the last page. Any page failure ends the
    /// sequence with that error; items already delivered stay delivered.
    pub async fn call_paginated<F>(
        &self,
        method: &str,
        params: &CallParameters,
        pagination: Pagination,
        mut on_item: F,
    ) -> Result<()>
    where
        F: FnMut(Value),
    {
        let mut cursor = PageCursor::new(params, pagination);
        loop {
            let response = self.call(method, cursor.page_params()).await?;
            let page = Page::from_value(response)?;
            let received = page.items.len();
            debug!(
                method,
                offset = cursor.offset,
                received,
                count = page.count,
                "page received"
            );
            page.items.into_iter().for_each(&mut on_item);

            if !cursor.advance(received, page.count) {
                return Ok(());
            }
            if self.connection.is_closing() {
                return Err(Error::Closing);
            }
        }
    }
}
