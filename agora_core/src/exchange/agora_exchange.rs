// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;

use agora_order::{Order, SignedOrder};
use alloy::{
    primitives::{Address, U256},
    sol_types::Eip712Domain,
};
use log::{info, warn};
use tokio::sync::Mutex;

use super::adapters::{
    AssetTransfer, ChainEnvironment, CurrencyTransfer, EventEmitter, InterfaceProbe, NonceRead,
    NonceStore, Transactional,
};
use crate::{
    agora_eip712_domain,
    events::ExchangeEvent,
    nonce::NonceRegistry,
    settlement::{settle, Fulfillment},
    validation::{parse_signed_order, validate_order},
    Error, Result,
};

pub struct Exchange<E> {
    /// Context that implements adapters
    context: E,

    /// Identity of this exchange instance, bound into every order signature.
    verifying_contract: Address,

    /// The only identity allowed to move the `current_nonce` counters.
    owner: Address,

    /// Held for the whole duration of a unit of work.
    unit_of_work: Mutex<()>,
}

impl<E> Exchange<E> {
    /// Creates a new exchange settling through `context`.
    ///
    /// `verifying_contract` becomes part of the EIP712 domain, `owner` is the
    /// administrative identity.
    pub fn new(context: E, verifying_contract: Address, owner: Address) -> Self {
        Self {
            context,
            verifying_contract,
            owner,
            unit_of_work: Mutex::new(()),
        }
    }

    pub fn context(&self) -> &E {
        &self.context
    }

    pub fn verifying_contract(&self) -> Address {
        self.verifying_contract
    }

    pub fn owner(&self) -> Address {
        self.owner
    }
}

impl<E> Exchange<E>
where
    E: ChainEnvironment + Sync,
{
    /// Derives the EIP712 domain from the chain ID the environment reports right now.
    ///
    /// Never cached: after a change of chain, orders signed for the previous one stop
    /// validating.
    pub async fn domain_separator(&self) -> Result<Eip712Domain> {
        let chain_id = self.context.chain_id().await.map_err(Error::adapter)?;
        Ok(agora_eip712_domain(chain_id, self.verifying_contract))
    }
}

impl<E> Exchange<E>
where
    E: ChainEnvironment + NonceRead + Sync,
{
    /// Runs every validation check on `signed_order` without changing any state.
    ///
    /// # Errors
    ///
    /// See [`validate_order`] for the checks and their errors. Returns
    /// [`Error::AdapterError`] if the environment or the nonce store fails.
    pub async fn validate_order(&self, signed_order: &SignedOrder) -> Result<()> {
        let domain_separator = self.domain_separator().await?;
        let now = self
            .context
            .block_timestamp()
            .await
            .map_err(Error::adapter)?;
        validate_order(&self.context, &domain_separator, now, signed_order).await
    }
}

impl<E> Exchange<E>
where
    E: NonceRead + Sync,
{
    pub async fn current_nonce(&self, user: Address) -> Result<U256> {
        self.context
            .current_nonce(user)
            .await
            .map_err(Error::adapter)
    }

    pub async fn min_order_nonce(&self, user: Address) -> Result<U256> {
        self.context
            .min_order_nonce(user)
            .await
            .map_err(Error::adapter)
    }

    pub async fn is_user_order_nonce_executed_or_cancelled(
        &self,
        user: Address,
        nonce: U256,
    ) -> Result<bool> {
        self.context
            .is_nonce_executed_or_cancelled(user, nonce)
            .await
            .map_err(Error::adapter)
    }
}

impl<E> Exchange<E>
where
    E: Transactional + Sync,
{
    /// Runs `work` as one unit of work: exclusive, checkpointed, and rolled back if it
    /// fails.
    async fn run_in_unit<T, W>(&self, work: W) -> Result<T>
    where
        W: Future<Output = Result<T>>,
    {
        let _unit = self.unit_of_work.lock().await;
        let checkpoint = self.context.checkpoint().await.map_err(Error::adapter)?;

        match work.await {
            Ok(value) => {
                self.context
                    .commit(checkpoint)
                    .await
                    .map_err(Error::adapter)?;
                Ok(value)
            }
            Err(err) => {
                warn!("Rolling back failed unit of work: {err}");
                self.context
                    .rollback(checkpoint)
                    .await
                    .map_err(Error::adapter)?;
                Err(err)
            }
        }
    }
}

impl<E> Exchange<E>
where
    E: EventEmitter + Sync,
{
    async fn emit(&self, event: ExchangeEvent) -> Result<()> {
        self.context.emit(event).await.map_err(Error::adapter)
    }
}

impl<E> Exchange<E>
where
    E: ChainEnvironment
        + NonceRead
        + NonceStore
        + CurrencyTransfer
        + InterfaceProbe
        + AssetTransfer
        + EventEmitter
        + Transactional
        + Sync,
{
    /// Validates `signed_order`, consumes its nonce and settles it against `caller`.
    ///
    /// On an ask `caller` buys the asset, on a bid `caller` sells it. Nothing persists
    /// if any step fails.
    ///
    /// # Errors
    ///
    /// Validation errors ([`Error::InvalidSignature`], [`Error::OrderNotActive`],
    /// [`Error::OrderExpired`], [`Error::InvalidNonce`]), [`Error::InvalidTokenAmount`]
    /// for unsupported collections, [`Error::CurrencyTransferFailed`] and
    /// [`Error::AssetTransferFailed`] for failed legs, [`Error::AdapterError`] otherwise.
    pub async fn fulfill_order(
        &self,
        signed_order: &SignedOrder,
        caller: Address,
    ) -> Result<Fulfillment> {
        self.run_in_unit(self.fulfill_order_in_unit(signed_order, caller))
            .await
    }

    /// Same as [`Self::fulfill_order`] for an order whose signature arrives as raw
    /// `r || s || v` bytes.
    pub async fn fulfill_order_with_signature(
        &self,
        order: Order,
        signature: &[u8],
        caller: Address,
    ) -> Result<Fulfillment> {
        let signed_order = parse_signed_order(order, signature)?;
        self.fulfill_order(&signed_order, caller).await
    }

    async fn fulfill_order_in_unit(
        &self,
        signed_order: &SignedOrder,
        caller: Address,
    ) -> Result<Fulfillment> {
        let order = &signed_order.message;
        self.validate_order(signed_order).await?;

        // Consumed before any token contract is called.
        NonceRegistry::new(&self.context)
            .consume(order.signer, order.nonce)
            .await?;

        let fulfillment = settle(&self.context, order, caller).await?;

        let order_hash = signed_order.struct_hash();
        self.emit(ExchangeEvent::OrderFulfilled {
            order_hash,
            order_nonce: order.nonce,
            fulfillment: fulfillment.clone(),
        })
        .await?;

        info!(
            "Order {order_hash} (nonce {} of {}) fulfilled: {} sold to {} for {} of {}",
            order.nonce,
            order.signer,
            fulfillment.seller,
            fulfillment.buyer,
            fulfillment.price,
            fulfillment.currency
        );
        Ok(fulfillment)
    }
}

impl<E> Exchange<E>
where
    E: NonceRead + NonceStore + EventEmitter + Transactional + Sync,
{
    /// Cancels the orders of `caller` carrying any of `order_nonces`.
    ///
    /// Duplicates and nonces cancelled earlier are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNonce`] if `order_nonces` is empty or lists a nonce
    /// below the caller's minimum order nonce.
    pub async fn cancel_multiple_orders(
        &self,
        caller: Address,
        order_nonces: &[U256],
    ) -> Result<()> {
        self.run_in_unit(async {
            NonceRegistry::new(&self.context)
                .cancel_individual(caller, order_nonces)
                .await?;
            self.emit(ExchangeEvent::CancelMultipleOrders {
                user: caller,
                order_nonces: order_nonces.to_vec(),
            })
            .await?;
            info!("{caller} cancelled {} order nonce(s)", order_nonces.len());
            Ok(())
        })
        .await
    }

    /// Cancels every order of `caller` with a nonce below `min_nonce`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNonce`] if `min_nonce` is not strictly above the current
    /// minimum, or is [`crate::nonce::MAX_CANCEL_RANGE`] or more above it.
    pub async fn cancel_all_orders_for_sender(
        &self,
        caller: Address,
        min_nonce: U256,
    ) -> Result<()> {
        self.run_in_unit(async {
            NonceRegistry::new(&self.context)
                .cancel_bulk(caller, min_nonce)
                .await?;
            self.emit(ExchangeEvent::CancelAllOrders {
                user: caller,
                new_min_nonce: min_nonce,
            })
            .await?;
            info!("{caller} cancelled all orders below nonce {min_nonce}");
            Ok(())
        })
        .await
    }
}

impl<E> Exchange<E>
where
    E: NonceRead + NonceStore + Transactional + Sync,
{
    /// Increments the `current_nonce` counter of `user` and returns its new value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] unless `caller` is the exchange owner.
    pub async fn increment_current_nonce(&self, caller: Address, user: Address) -> Result<U256> {
        if caller != self.owner {
            return Err(Error::Unauthorized {
                caller,
                action: "increment the current nonce".to_string(),
            });
        }
        self.run_in_unit(async {
            NonceRegistry::new(&self.context)
                .bump_current_nonce(user)
                .await
        })
        .await
    }
}
