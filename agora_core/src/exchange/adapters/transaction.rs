// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

/// All-or-nothing boundary around a unit of work.
///
/// The exchange takes a checkpoint before touching any state, then either commits it
/// or rolls back to it. Rolling back must undo every write made through the other
/// adapters since the checkpoint, including nonce consumption, both transfer legs and
/// emitted events. There is no compensating action at the exchange level.
///
/// The exchange never runs two units of work at the same time.
///
/// # Example
///
/// For example code see [crate::exchange::context::memory::InMemoryContext]
#[async_trait]
pub trait Transactional {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from
    /// the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Whatever the adapter needs to restore or finalize the state.
    type Checkpoint: Send + 'static;

    async fn checkpoint(&self) -> Result<Self::Checkpoint, Self::AdapterError>;

    /// Makes the writes since `checkpoint` permanent.
    async fn commit(&self, _checkpoint: Self::Checkpoint) -> Result<(), Self::AdapterError> {
        Ok(())
    }

    /// Discards the writes since `checkpoint`.
    async fn rollback(&self, checkpoint: Self::Checkpoint) -> Result<(), Self::AdapterError>;
}
