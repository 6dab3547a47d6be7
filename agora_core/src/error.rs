// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! Module containing the Agora error type
//!

use alloy::primitives::{Address, U256};
use thiserror::Error as ThisError;

use crate::nonce::NonceError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("Invalid signature for order signer {signer}: {source_error_message}")]
    InvalidSignature {
        signer: Address,
        source_error_message: String,
    },
    #[error("Order not active: starts at {start_time}, current time is {now}")]
    OrderNotActive { start_time: U256, now: u64 },
    #[error("Order expired: ended at {end_time}, current time is {now}")]
    OrderExpired { end_time: U256, now: u64 },
    #[error("Invalid nonce for {user}: {reason}")]
    InvalidNonce { user: Address, reason: NonceError },
    #[error("Invalid token amount: collection {collection} supports neither ERC721 nor ERC1155")]
    InvalidTokenAmount { collection: Address },
    #[error("{caller} is not allowed to {action}")]
    Unauthorized { caller: Address, action: String },
    #[error("Currency transfer failed: {source_error}")]
    CurrencyTransferFailed { source_error: anyhow::Error },
    #[error("Asset transfer failed: {source_error}")]
    AssetTransferFailed { source_error: anyhow::Error },
    #[error("Error from adapter.\n Caused by: {source_error}")]
    AdapterError { source_error: anyhow::Error },
}

impl Error {
    pub(crate) fn adapter<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::AdapterError {
            source_error: anyhow::Error::new(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
