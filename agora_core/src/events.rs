// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! Records emitted by successful exchange calls.

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::settlement::Fulfillment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExchangeEvent {
    /// Every order of `user` with a nonce below `new_min_nonce` is cancelled.
    CancelAllOrders { user: Address, new_min_nonce: U256 },
    /// The listed nonces of `user` are cancelled.
    CancelMultipleOrders {
        user: Address,
        order_nonces: Vec<U256>,
    },
    /// An order was settled. `order_hash` is the EIP712 struct hash of the order.
    OrderFulfilled {
        order_hash: B256,
        order_nonce: U256,
        fulfillment: Fulfillment,
    },
}
