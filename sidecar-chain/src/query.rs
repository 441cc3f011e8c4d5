//! Read-side service with request validation.

use std::sync::Arc;

use thiserror::Error;

use sidecar_core::{
    Block, FoundOrNot, Hash32, MempoolTransaction, SmartContract, Transaction,
};

use crate::chain::{BlockQuery, ChainStats, ChainStore};
use crate::error::ChainError;
use crate::page::{Order, Page};

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_LIMIT: usize = 96;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: usize = 200;

/// Errors returned by [`QueryService`].
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("limit must be between 1 and {max}, got {limit}")]
    InvalidLimit { limit: usize, max: usize },

    #[error("offset {0} is out of range")]
    InvalidOffset(usize),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Page size bounds for one kind of list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

impl PageLimits {
    /// Resolve optional paging parameters against these bounds.
    pub fn resolve(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<(usize, usize), QueryError> {
        let limit = limit.unwrap_or(self.default_limit);
        if limit == 0 || limit > self.max_limit {
            return Err(QueryError::InvalidLimit {
                limit,
                max: self.max_limit,
            });
        }
        let offset = offset.unwrap_or(0);
        // Offsets that overflow position arithmetic are rejected up front.
        if offset.checked_add(limit).is_none() {
            return Err(QueryError::InvalidOffset(offset));
        }
        Ok((limit, offset))
    }
}

/// Resolved paging parameters echoed back to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
    pub order: Order,
}

/// Validated, read-only access to the datastore.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<ChainStore>,
    tx_limits: PageLimits,
    mempool_limits: PageLimits,
}

impl QueryService {
    /// Create a service with the default page limits.
    pub fn new(store: Arc<ChainStore>) -> Self {
        Self::with_limits(store, PageLimits::default(), PageLimits::default())
    }

    /// Create a service with explicit page limits.
    pub fn with_limits(
        store: Arc<ChainStore>,
        tx_limits: PageLimits,
        mempool_limits: PageLimits,
    ) -> Self {
        Self {
            store,
            tx_limits,
            mempool_limits,
        }
    }

    /// The underlying datastore.
    pub fn store(&self) -> &Arc<ChainStore> {
        &self.store
    }

    /// Canonical transactions, most recent first unless `order` says otherwise.
    pub fn transactions(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
        order: Option<Order>,
    ) -> Result<(PageRequest, Page<Transaction>), QueryError> {
        let (limit, offset) = self.tx_limits.resolve(limit, offset)?;
        let order = order.unwrap_or_default();
        let page = self.store.get_transactions_page(limit, offset, order)?;
        Ok((PageRequest { limit, offset, order }, page))
    }

    /// Pending transactions by receipt time.
    pub fn mempool(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
        order: Option<Order>,
    ) -> Result<(PageRequest, Page<MempoolTransaction>), QueryError> {
        let (limit, offset) = self.mempool_limits.resolve(limit, offset)?;
        let order = order.unwrap_or_default();
        let page = self.store.get_mempool_page(limit, offset, order)?;
        Ok((PageRequest { limit, offset, order }, page))
    }

    pub fn transaction(&self, tx_id: &Hash32) -> Result<FoundOrNot<Transaction>, QueryError> {
        Ok(self.store.get_transaction(tx_id)?)
    }

    /// A mempool record that is still pending.
    pub fn pending_transaction(
        &self,
        tx_id: &Hash32,
    ) -> Result<FoundOrNot<MempoolTransaction>, QueryError> {
        let record = self.store.get_mempool_transaction(tx_id)?.into_option();
        Ok(record.filter(|tx| !tx.pruned).into())
    }

    pub fn block(&self, query: BlockQuery) -> Result<FoundOrNot<Block>, QueryError> {
        Ok(self.store.get_block(query)?)
    }

    pub fn current_block(&self) -> Result<FoundOrNot<Block>, QueryError> {
        Ok(self.store.get_current_block()?)
    }

    pub fn block_transactions(&self, block_hash: &Hash32) -> Result<Vec<Transaction>, QueryError> {
        Ok(self.store.get_block_transactions(block_hash)?)
    }

    pub fn smart_contract(&self, contract_id: &str) -> Result<FoundOrNot<SmartContract>, QueryError> {
        Ok(self.store.get_smart_contract(contract_id)?)
    }

    pub fn status(&self) -> Result<ChainStats, QueryError> {
        Ok(self.store.stats()?)
    }
}
