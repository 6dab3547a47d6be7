// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use agora_eip712_message::Eip712SignedMessage;
use alloy::{
    primitives::{Address, U256},
    sol,
};
use serde::{Deserialize, Serialize};

/// Validity window given to orders built with [`Order::ask`] and [`Order::bid`].
pub const DEFAULT_ORDER_LIFETIME_SECS: u64 = 24 * 60 * 60;

/// A signed order message
pub type SignedOrder = Eip712SignedMessage<Order>;

sol! {
    /// A maker's intent to trade one asset position against fungible currency.
    ///
    /// The field order is part of the EIP712 type hash and must never change.
    #[derive(Debug, Serialize, Deserialize, Eq, PartialEq)]
    struct Order {
        /// Author of the order
        address signer;
        /// `true` if the signer sells the asset, `false` if the signer buys it
        bool isAsk;
        /// Asset contract
        address collection;
        uint256 tokenId;
        /// Quantity, only meaningful for semi-fungible collections
        uint256 amount;
        /// Fungible token used for payment
        address currency;
        /// Amount of `currency` paid by the buyer to the seller
        uint256 price;
        /// First second (inclusive) the order can be fulfilled at
        uint256 startTime;
        /// Last second (inclusive) the order can be fulfilled at
        uint256 endTime;
        /// Signer-scoped replay protection value, not required to be sequential
        uint256 nonce;
    }
}

fn get_current_timestamp_u64_s() -> Result<u64, SystemTimeError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

impl Order {
    /// Returns a sell order for a single unit of `token_id`, valid from now for
    /// [`DEFAULT_ORDER_LIFETIME_SECS`], using nonce `0`.
    pub fn ask(
        signer: Address,
        collection: Address,
        token_id: U256,
        currency: Address,
        price: U256,
    ) -> Result<Self, SystemTimeError> {
        Self::with_role(true, signer, collection, token_id, currency, price)
    }

    /// Returns a buy order for a single unit of `token_id`, valid from now for
    /// [`DEFAULT_ORDER_LIFETIME_SECS`], using nonce `0`.
    pub fn bid(
        signer: Address,
        collection: Address,
        token_id: U256,
        currency: Address,
        price: U256,
    ) -> Result<Self, SystemTimeError> {
        Self::with_role(false, signer, collection, token_id, currency, price)
    }

    fn with_role(
        is_ask: bool,
        signer: Address,
        collection: Address,
        token_id: U256,
        currency: Address,
        price: U256,
    ) -> Result<Self, SystemTimeError> {
        let now = get_current_timestamp_u64_s()?;
        Ok(Self {
            signer,
            isAsk: is_ask,
            collection,
            tokenId: token_id,
            amount: U256::from(1),
            currency,
            price,
            startTime: U256::from(now),
            endTime: U256::from(now + DEFAULT_ORDER_LIFETIME_SECS),
            nonce: U256::ZERO,
        })
    }

    pub fn with_amount(mut self, amount: U256) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_nonce(mut self, nonce: U256) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the inclusive `[start_time, end_time]` validity window, in seconds.
    pub fn with_window(mut self, start_time: u64, end_time: u64) -> Self {
        self.startTime = U256::from(start_time);
        self.endTime = U256::from(end_time);
        self
    }
}

#[cfg(test)]
mod order_unit_test {
    use alloy::{primitives::address, sol_types::SolStruct};
    use rstest::*;

    use super::*;

    #[fixture]
    fn signer() -> Address {
        address!("abababababababababababababababababababab")
    }

    #[fixture]
    fn collection() -> Address {
        address!("deaddeaddeaddeaddeaddeaddeaddeaddeaddead")
    }

    #[fixture]
    fn currency() -> Address {
        address!("beefbeefbeefbeefbeefbeefbeefbeefbeefbeef")
    }

    #[rstest]
    fn type_string_is_stable() {
        assert_eq!(
            Order::eip712_encode_type(),
            "Order(address signer,bool isAsk,address collection,uint256 tokenId,\
             uint256 amount,address currency,uint256 price,uint256 startTime,\
             uint256 endTime,uint256 nonce)"
        );
    }

    #[rstest]
    fn ask_defaults(signer: Address, collection: Address, currency: Address) {
        let order = Order::ask(signer, collection, U256::from(7), currency, U256::from(100))
            .unwrap();

        assert!(order.isAsk);
        assert_eq!(order.amount, U256::from(1));
        assert_eq!(order.nonce, U256::ZERO);
        assert_eq!(
            order.endTime - order.startTime,
            U256::from(DEFAULT_ORDER_LIFETIME_SECS)
        );
    }

    #[rstest]
    fn builders_override_defaults(signer: Address, collection: Address, currency: Address) {
        let order = Order::bid(signer, collection, U256::from(7), currency, U256::from(100))
            .unwrap()
            .with_amount(U256::from(3))
            .with_nonce(U256::from(9))
            .with_window(10, 20);

        assert!(!order.isAsk);
        assert_eq!(order.amount, U256::from(3));
        assert_eq!(order.nonce, U256::from(9));
        assert_eq!(order.startTime, U256::from(10));
        assert_eq!(order.endTime, U256::from(20));
    }
}
