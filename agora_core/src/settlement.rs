// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Settlement
//!
//! Executes a validated order in two legs: the buyer pays the full price to the seller,
//! then the seller's asset moves to the buyer. The asset leg never runs if the payment
//! failed. A failure of the asset leg after a successful payment fails the whole
//! settlement; undoing the payment is the job of the surrounding unit of work.

use agora_order::Order;
use alloy::primitives::{Address, U256};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    asset::transfer_asset,
    exchange::adapters::{AssetTransfer, CurrencyTransfer, InterfaceProbe},
    Error, Result,
};

/// Outcome of a settled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfillment {
    pub seller: Address,
    pub buyer: Address,
    pub collection: Address,
    pub token_id: U256,
    pub amount: U256,
    pub currency: Address,
    pub price: U256,
}

/// Seller and buyer of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roles {
    pub seller: Address,
    pub buyer: Address,
}

impl Roles {
    /// On an ask the signer sells to the caller, on a bid the signer buys from the caller.
    pub fn resolve(order: &Order, caller: Address) -> Self {
        if order.isAsk {
            Roles {
                seller: order.signer,
                buyer: caller,
            }
        } else {
            Roles {
                seller: caller,
                buyer: order.signer,
            }
        }
    }
}

/// Runs both legs of `order` with `caller` as the counter-party.
///
/// The order must already be validated and its nonce consumed.
pub async fn settle<C>(context: &C, order: &Order, caller: Address) -> Result<Fulfillment>
where
    C: CurrencyTransfer + InterfaceProbe + AssetTransfer + Sync,
{
    let Roles { seller, buyer } = Roles::resolve(order, caller);

    debug!(
        "Paying {} of {} from {buyer} to {seller}",
        order.price, order.currency
    );
    context
        .transfer_from(order.currency, buyer, seller, order.price)
        .await
        .map_err(|err| Error::CurrencyTransferFailed {
            source_error: anyhow::Error::new(err),
        })?;

    transfer_asset(
        context,
        order.collection,
        seller,
        buyer,
        order.tokenId,
        order.amount,
    )
    .await?;

    Ok(Fulfillment {
        seller,
        buyer,
        collection: order.collection,
        token_id: order.tokenId,
        amount: order.amount,
        currency: order.currency,
        price: order.price,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use alloy::primitives::{address, Bytes, FixedBytes};
    use async_trait::async_trait;
    use rstest::*;

    use super::*;
    use crate::asset::INTERFACE_ID_ERC721;

    #[derive(Debug, thiserror::Error)]
    #[error("transfer rejected")]
    struct Rejected;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Leg {
        Currency { from: Address, to: Address },
        Asset { from: Address, to: Address },
    }

    /// Records the legs in call order; can be told to reject the payment.
    #[derive(Default)]
    struct RecordingLedger {
        reject_payment: bool,
        legs: Arc<Mutex<Vec<Leg>>>,
    }

    #[async_trait]
    impl CurrencyTransfer for RecordingLedger {
        type AdapterError = Rejected;

        async fn transfer_from(
            &self,
            _currency: Address,
            from: Address,
            to: Address,
            _amount: U256,
        ) -> std::result::Result<(), Rejected> {
            if self.reject_payment {
                return Err(Rejected);
            }
            self.legs.lock().unwrap().push(Leg::Currency { from, to });
            Ok(())
        }
    }

    #[async_trait]
    impl InterfaceProbe for RecordingLedger {
        type AdapterError = Rejected;

        async fn supports_interface(
            &self,
            _collection: Address,
            interface_id: FixedBytes<4>,
        ) -> std::result::Result<bool, Rejected> {
            Ok(interface_id == INTERFACE_ID_ERC721)
        }
    }

    #[async_trait]
    impl AssetTransfer for RecordingLedger {
        type AdapterError = Rejected;

        async fn safe_transfer_non_fungible(
            &self,
            _collection: Address,
            from: Address,
            to: Address,
            _token_id: U256,
        ) -> std::result::Result<(), Rejected> {
            self.legs.lock().unwrap().push(Leg::Asset { from, to });
            Ok(())
        }

        async fn safe_transfer_semi_fungible(
            &self,
            _collection: Address,
            _from: Address,
            _to: Address,
            _token_id: U256,
            _amount: U256,
            _data: Bytes,
        ) -> std::result::Result<(), Rejected> {
            Err(Rejected)
        }
    }

    #[fixture]
    fn maker() -> Address {
        address!("abababababababababababababababababababab")
    }

    #[fixture]
    fn taker() -> Address {
        address!("cdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcd")
    }

    fn order(signer: Address, is_ask: bool) -> Order {
        Order {
            signer,
            isAsk: is_ask,
            collection: address!("deaddeaddeaddeaddeaddeaddeaddeaddeaddead"),
            tokenId: U256::from(3),
            amount: U256::from(1),
            currency: address!("beefbeefbeefbeefbeefbeefbeefbeefbeefbeef"),
            price: U256::from(100),
            startTime: U256::ZERO,
            endTime: U256::MAX,
            nonce: U256::ZERO,
        }
    }

    #[rstest]
    fn roles(maker: Address, taker: Address) {
        assert_eq!(
            Roles::resolve(&order(maker, true), taker),
            Roles {
                seller: maker,
                buyer: taker
            }
        );
        assert_eq!(
            Roles::resolve(&order(maker, false), taker),
            Roles {
                seller: taker,
                buyer: maker
            }
        );
    }

    #[rstest]
    #[tokio::test]
    async fn pays_then_delivers(maker: Address, taker: Address) {
        let ledger = RecordingLedger::default();
        let fulfillment = settle(&ledger, &order(maker, false), taker).await.unwrap();

        assert_eq!(fulfillment.seller, taker);
        assert_eq!(fulfillment.buyer, maker);
        assert_eq!(fulfillment.price, U256::from(100));
        assert_eq!(
            *ledger.legs.lock().unwrap(),
            vec![
                Leg::Currency {
                    from: maker,
                    to: taker
                },
                Leg::Asset {
                    from: taker,
                    to: maker
                },
            ]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn failed_payment_skips_asset_leg(maker: Address, taker: Address) {
        let ledger = RecordingLedger {
            reject_payment: true,
            ..Default::default()
        };
        assert!(matches!(
            settle(&ledger, &order(maker, true), taker).await,
            Err(Error::CurrencyTransferFailed { .. })
        ));
        assert!(ledger.legs.lock().unwrap().is_empty());
    }
}
