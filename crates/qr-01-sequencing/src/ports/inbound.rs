//! Inbound Ports (Driving Ports / API)

use crate::domain::errors::SequencingError;
use async_trait::async_trait;
use shared_types::{OrderedRequest, Transaction};

/// Client-facing proposal API.
#[async_trait]
pub trait ProposalApi: Send + Sync {
    /// Hash, store and broadcast `txs` as the client's next ordered request.
    async fn propose(&self, txs: Vec<Transaction>) -> Result<OrderedRequest, SequencingError>;
}
