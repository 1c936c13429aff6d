//! Downstream sinks for normalized trade records.

pub mod grpc;

use async_trait::async_trait;
use tw_core::NormalizedTradeRecord;
use tw_core::error::TwResult;

pub use grpc::GrpcSink;

/// Receives one record per push; failures are [`TwError::Push`](tw_core::error::TwError::Push).
#[async_trait]
pub trait TradeSink: Send + Sync {
    async fn push(&self, record: NormalizedTradeRecord) -> TwResult<()>;
}
