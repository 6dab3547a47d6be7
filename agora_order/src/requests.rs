// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! Caller authorizations.
//!
//! Each service call that acts on behalf of an address carries one of these messages
//! signed by that address. The recovered signer is the caller of the operation.
//! Replaying one of them is harmless: a fill consumes the order nonce once, cancellations
//! are idempotent or strictly increasing, and a nonce increment is bound to the counter
//! value it expects.

use agora_eip712_message::Eip712SignedMessage;
use alloy::sol;
use serde::{Deserialize, Serialize};

pub type SignedFillOrder = Eip712SignedMessage<FillOrder>;
pub type SignedCancelOrders = Eip712SignedMessage<CancelOrders>;
pub type SignedCancelAllOrders = Eip712SignedMessage<CancelAllOrders>;
pub type SignedIncrementNonce = Eip712SignedMessage<IncrementNonce>;

sol! {
    /// Taker's consent to fulfill the order with the given struct hash
    #[derive(Debug, Serialize, Deserialize, Eq, PartialEq)]
    struct FillOrder {
        bytes32 orderHash;
    }

    /// Individual cancellation of the signer's orders
    #[derive(Debug, Serialize, Deserialize, Eq, PartialEq)]
    struct CancelOrders {
        uint256[] orderNonces;
    }

    /// Bulk cancellation of every signer order below `minNonce`
    #[derive(Debug, Serialize, Deserialize, Eq, PartialEq)]
    struct CancelAllOrders {
        uint256 minNonce;
    }

    /// Administrative increment of `user`'s counter, valid while it equals `currentNonce`
    #[derive(Debug, Serialize, Deserialize, Eq, PartialEq)]
    struct IncrementNonce {
        address user;
        uint256 currentNonce;
    }
}
