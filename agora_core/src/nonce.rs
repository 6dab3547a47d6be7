// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Nonce registry
//!
//! Every signer owns three pieces of state:
//!
//! - `current_nonce`: a counter for external bookkeeping, only moved by the exchange owner.
//!   Order validation never reads it.
//! - `min_order_nonce`: every order nonce strictly below it is invalid. Raising it cancels
//!   all older orders at once.
//! - `executed_or_cancelled`: nonces consumed by a fulfillment or cancelled one by one.
//!   Entries are never removed.
//!
//! An order nonce `n` can be fulfilled iff `n >= min_order_nonce` and `n` is not in
//! `executed_or_cancelled`.
//!
//! [`NonceRegistry`] enforces those rules on top of the [`NonceRead`] and [`NonceStore`]
//! adapters. [`NonceState`] is the plain per-address record an adapter can persist.

use std::collections::BTreeSet;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    exchange::adapters::{NonceRead, NonceStore},
    Error, Result,
};

/// Upper bound (exclusive) on how far a single bulk cancellation can move the watermark.
pub const MAX_CANCEL_RANGE: u64 = 500_000;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonceError {
    #[error("nonce {nonce} was already executed or cancelled")]
    AlreadyExecutedOrCancelled { nonce: U256 },
    #[error("nonce {nonce} is below the minimum order nonce {min_order_nonce}")]
    BelowMinimum { nonce: U256, min_order_nonce: U256 },
    #[error("cancellation request does not list any nonce")]
    EmptyCancellation,
    #[error("new minimum {new_min_nonce} is not above the current minimum {min_order_nonce}")]
    MinimumNotIncreased {
        new_min_nonce: U256,
        min_order_nonce: U256,
    },
    #[error(
        "new minimum {new_min_nonce} is {MAX_CANCEL_RANGE} or more above the current minimum \
         {min_order_nonce}"
    )]
    CancelRangeTooLarge {
        new_min_nonce: U256,
        min_order_nonce: U256,
    },
}

/// Checks that `nonce` can still be used to fulfill an order.
pub fn check_order_nonce(
    nonce: U256,
    min_order_nonce: U256,
    executed_or_cancelled: bool,
) -> std::result::Result<(), NonceError> {
    if nonce < min_order_nonce {
        return Err(NonceError::BelowMinimum {
            nonce,
            min_order_nonce,
        });
    }
    if executed_or_cancelled {
        return Err(NonceError::AlreadyExecutedOrCancelled { nonce });
    }
    Ok(())
}

/// Checks an individual cancellation request. Duplicates and already cancelled nonces
/// are accepted; nonces below the watermark are not.
pub fn check_cancel_multiple(
    order_nonces: &[U256],
    min_order_nonce: U256,
) -> std::result::Result<(), NonceError> {
    if order_nonces.is_empty() {
        return Err(NonceError::EmptyCancellation);
    }
    if let Some(&nonce) = order_nonces.iter().find(|&&n| n < min_order_nonce) {
        return Err(NonceError::BelowMinimum {
            nonce,
            min_order_nonce,
        });
    }
    Ok(())
}

/// Checks a bulk cancellation: the watermark must strictly increase, by less than
/// [`MAX_CANCEL_RANGE`].
pub fn check_cancel_all(
    new_min_nonce: U256,
    min_order_nonce: U256,
) -> std::result::Result<(), NonceError> {
    if new_min_nonce <= min_order_nonce {
        return Err(NonceError::MinimumNotIncreased {
            new_min_nonce,
            min_order_nonce,
        });
    }
    if new_min_nonce - min_order_nonce >= U256::from(MAX_CANCEL_RANGE) {
        return Err(NonceError::CancelRangeTooLarge {
            new_min_nonce,
            min_order_nonce,
        });
    }
    Ok(())
}

/// Nonce state of a single address. The default value is the state of an address that
/// was never seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceState {
    pub current_nonce: U256,
    pub min_order_nonce: U256,
    pub executed_or_cancelled: BTreeSet<U256>,
}

impl NonceState {
    pub fn is_valid(&self, nonce: U256) -> bool {
        check_order_nonce(
            nonce,
            self.min_order_nonce,
            self.executed_or_cancelled.contains(&nonce),
        )
        .is_ok()
    }

    /// Marks `nonce` as executed or cancelled, without any check.
    pub fn consume(&mut self, nonce: U256) {
        self.executed_or_cancelled.insert(nonce);
    }

    /// Moves the watermark. Never lowers it.
    pub fn raise_min_order_nonce(&mut self, min_order_nonce: U256) {
        self.min_order_nonce = self.min_order_nonce.max(min_order_nonce);
    }

    /// Increments the counter and returns the new value.
    pub fn bump_current_nonce(&mut self) -> U256 {
        self.current_nonce = self.current_nonce.saturating_add(U256::from(1));
        self.current_nonce
    }
}

/// Applies the nonce rules on top of a context implementing the nonce adapters.
pub struct NonceRegistry<'a, C> {
    context: &'a C,
}

impl<'a, C> NonceRegistry<'a, C> {
    pub fn new(context: &'a C) -> Self {
        Self { context }
    }
}

impl<C> NonceRegistry<'_, C>
where
    C: NonceRead + Sync,
{
    /// Returns [`Error::InvalidNonce`] unless `nonce` can be used by `user` right now.
    pub async fn check(&self, user: Address, nonce: U256) -> Result<()> {
        let min_order_nonce = self
            .context
            .min_order_nonce(user)
            .await
            .map_err(Error::adapter)?;
        let executed_or_cancelled = self
            .context
            .is_nonce_executed_or_cancelled(user, nonce)
            .await
            .map_err(Error::adapter)?;

        check_order_nonce(nonce, min_order_nonce, executed_or_cancelled)
            .map_err(|reason| Error::InvalidNonce { user, reason })
    }

    pub async fn is_valid(&self, user: Address, nonce: U256) -> Result<bool> {
        match self.check(user, nonce).await {
            Ok(()) => Ok(true),
            Err(Error::InvalidNonce { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl<C> NonceRegistry<'_, C>
where
    C: NonceRead + NonceStore + Sync,
{
    /// Marks `nonce` executed. The caller must have checked it first.
    pub async fn consume(&self, user: Address, nonce: U256) -> Result<()> {
        self.context
            .mark_nonces_executed_or_cancelled(user, &[nonce])
            .await
            .map_err(Error::adapter)
    }

    /// Cancels each of `order_nonces` for `user`.
    pub async fn cancel_individual(&self, user: Address, order_nonces: &[U256]) -> Result<()> {
        let min_order_nonce = self
            .context
            .min_order_nonce(user)
            .await
            .map_err(Error::adapter)?;
        check_cancel_multiple(order_nonces, min_order_nonce)
            .map_err(|reason| Error::InvalidNonce { user, reason })?;

        self.context
            .mark_nonces_executed_or_cancelled(user, order_nonces)
            .await
            .map_err(Error::adapter)
    }

    /// Cancels every order of `user` with a nonce below `new_min_nonce`.
    pub async fn cancel_bulk(&self, user: Address, new_min_nonce: U256) -> Result<()> {
        let min_order_nonce = self
            .context
            .min_order_nonce(user)
            .await
            .map_err(Error::adapter)?;
        check_cancel_all(new_min_nonce, min_order_nonce)
            .map_err(|reason| Error::InvalidNonce { user, reason })?;

        self.context
            .update_min_order_nonce(user, new_min_nonce)
            .await
            .map_err(Error::adapter)
    }

    /// Increments `user`'s counter. Authorization is the caller's concern.
    pub async fn bump_current_nonce(&self, user: Address) -> Result<U256> {
        self.context
            .increment_current_nonce(user)
            .await
            .map_err(Error::adapter)
    }
}
