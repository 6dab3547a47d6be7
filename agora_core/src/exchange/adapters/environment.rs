// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

/// Execution environment of the exchange.
///
/// Both values are read on every call: the chain ID feeds the domain separator, the
/// timestamp is compared against order validity windows.
///
/// # Example
///
/// For example code see [crate::exchange::context::memory::InMemoryContext]
#[async_trait]
pub trait ChainEnvironment {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from
    /// the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    async fn chain_id(&self) -> Result<u64, Self::AdapterError>;

    /// Current chain time, in seconds.
    async fn block_timestamp(&self) -> Result<u64, Self::AdapterError>;
}
