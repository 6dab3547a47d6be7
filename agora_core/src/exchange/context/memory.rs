// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory context implementation for the Agora exchange.
//!
//! Keeps nonces, currency balances, token ownership and emitted events in a single
//! state value behind a lock. A checkpoint is a copy of that value, so rolling back a
//! unit of work restores everything at once.
//! It is useful for testing and development purposes.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use alloy::primitives::{Address, Bytes, FixedBytes, U256};
use async_trait::async_trait;
use thiserror::Error;

use crate::{
    asset::AssetKind, events::ExchangeEvent, exchange::adapters::*, nonce::NonceState,
};

/// Called by the asset adapter right after a token moved, the way a token contract
/// calls back into the receiver. Returning an error rejects the transfer.
pub type AssetTransferHook = Arc<dyn Fn(&InMemoryContext) -> Result<(), String> + Send + Sync>;

#[derive(Debug, Error)]
pub enum InMemoryError {
    #[error("something went wrong: {error}")]
    AdapterError { error: String },
    #[error("{owner} holds {available} of {token}, {needed} needed")]
    InsufficientBalance {
        token: Address,
        owner: Address,
        needed: U256,
        available: U256,
    },
    #[error("{from} does not own token {token_id} of {collection}")]
    NotOwner {
        collection: Address,
        token_id: U256,
        from: Address,
    },
    #[error("transfer rejected by receiver: {reason}")]
    TransferRejected { reason: String },
}

/// Everything a unit of work can change.
#[derive(Debug, Clone, Default)]
pub struct InMemoryState {
    pub nonces: HashMap<Address, NonceState>,
    /// Keyed by (currency, owner).
    pub currency_balances: HashMap<(Address, Address), U256>,
    pub interfaces: HashMap<Address, HashSet<FixedBytes<4>>>,
    /// Keyed by (collection, token id).
    pub token_owners: HashMap<(Address, U256), Address>,
    /// Keyed by (collection, token id, owner).
    pub token_balances: HashMap<(Address, U256, Address), U256>,
    pub events: Vec<ExchangeEvent>,
}

#[derive(Clone)]
pub struct InMemoryContext {
    state: Arc<RwLock<InMemoryState>>,
    chain_id: Arc<AtomicU64>,
    /// Fixed block time in seconds; the system clock is used when unset.
    timestamp: Arc<RwLock<Option<u64>>>,
    asset_transfer_hook: Arc<RwLock<Option<AssetTransferHook>>>,
}

fn poisoned<T>(_: T) -> InMemoryError {
    InMemoryError::AdapterError {
        error: "state lock poisoned".to_owned(),
    }
}

impl InMemoryContext {
    pub fn new(chain_id: u64) -> Self {
        InMemoryContext {
            state: Arc::new(RwLock::new(InMemoryState::default())),
            chain_id: Arc::new(AtomicU64::new(chain_id)),
            timestamp: Arc::new(RwLock::new(None)),
            asset_transfer_hook: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_timestamp(self, timestamp: u64) -> Result<Self, InMemoryError> {
        self.set_timestamp(timestamp)?;
        Ok(self)
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, InMemoryState>, InMemoryError> {
        self.state.read().map_err(poisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, InMemoryState>, InMemoryError> {
        self.state.write().map_err(poisoned)
    }

    pub fn set_timestamp(&self, timestamp: u64) -> Result<(), InMemoryError> {
        *self.timestamp.write().map_err(poisoned)? = Some(timestamp);
        Ok(())
    }

    /// Simulates a change of chain.
    pub fn set_chain_id(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }

    pub fn set_asset_transfer_hook(&self, hook: AssetTransferHook) -> Result<(), InMemoryError> {
        *self.asset_transfer_hook.write().map_err(poisoned)? = Some(hook);
        Ok(())
    }

    pub fn clear_asset_transfer_hook(&self) -> Result<(), InMemoryError> {
        *self.asset_transfer_hook.write().map_err(poisoned)? = None;
        Ok(())
    }

    /// Returns a copy of the whole state.
    pub fn snapshot(&self) -> Result<InMemoryState, InMemoryError> {
        Ok(self.read_state()?.clone())
    }

    pub fn mint_currency(
        &self,
        currency: Address,
        owner: Address,
        amount: U256,
    ) -> Result<(), InMemoryError> {
        let mut state = self.write_state()?;
        let balance = state
            .currency_balances
            .entry((currency, owner))
            .or_default();
        *balance = balance.saturating_add(amount);
        Ok(())
    }

    pub fn currency_balance(&self, currency: Address, owner: Address) -> Result<U256, InMemoryError> {
        Ok(self
            .read_state()?
            .currency_balances
            .get(&(currency, owner))
            .copied()
            .unwrap_or_default())
    }

    /// Declares the interface ids `collection` reports support for.
    pub fn register_interfaces(
        &self,
        collection: Address,
        interface_ids: &[FixedBytes<4>],
    ) -> Result<(), InMemoryError> {
        self.write_state()?
            .interfaces
            .entry(collection)
            .or_default()
            .extend(interface_ids.iter().copied());
        Ok(())
    }

    pub fn register_collection(
        &self,
        collection: Address,
        kind: AssetKind,
    ) -> Result<(), InMemoryError> {
        self.register_interfaces(collection, &[kind.interface_id()])
    }

    pub fn mint_non_fungible(
        &self,
        collection: Address,
        token_id: U256,
        owner: Address,
    ) -> Result<(), InMemoryError> {
        self.write_state()?
            .token_owners
            .insert((collection, token_id), owner);
        Ok(())
    }

    pub fn owner_of(
        &self,
        collection: Address,
        token_id: U256,
    ) -> Result<Option<Address>, InMemoryError> {
        Ok(self
            .read_state()?
            .token_owners
            .get(&(collection, token_id))
            .copied())
    }

    pub fn mint_semi_fungible(
        &self,
        collection: Address,
        token_id: U256,
        owner: Address,
        amount: U256,
    ) -> Result<(), InMemoryError> {
        let mut state = self.write_state()?;
        let balance = state
            .token_balances
            .entry((collection, token_id, owner))
            .or_default();
        *balance = balance.saturating_add(amount);
        Ok(())
    }

    pub fn semi_fungible_balance(
        &self,
        collection: Address,
        token_id: U256,
        owner: Address,
    ) -> Result<U256, InMemoryError> {
        Ok(self
            .read_state()?
            .token_balances
            .get(&(collection, token_id, owner))
            .copied()
            .unwrap_or_default())
    }

    pub fn nonce_state(&self, user: Address) -> Result<NonceState, InMemoryError> {
        Ok(self
            .read_state()?
            .nonces
            .get(&user)
            .cloned()
            .unwrap_or_default())
    }

    pub fn events(&self) -> Result<Vec<ExchangeEvent>, InMemoryError> {
        Ok(self.read_state()?.events.clone())
    }

    /// Runs the receiver hook, if any, with no lock held.
    fn after_asset_transfer(&self) -> Result<(), InMemoryError> {
        let hook = self.asset_transfer_hook.read().map_err(poisoned)?.clone();
        match hook {
            Some(hook) => hook(self).map_err(|reason| InMemoryError::TransferRejected { reason }),
            None => Ok(()),
        }
    }
}

fn debit(
    balances: &mut HashMap<(Address, Address), U256>,
    token: Address,
    owner: Address,
    amount: U256,
) -> Result<(), InMemoryError> {
    let available = balances.get(&(token, owner)).copied().unwrap_or_default();
    let remaining = available
        .checked_sub(amount)
        .ok_or(InMemoryError::InsufficientBalance {
            token,
            owner,
            needed: amount,
            available,
        })?;
    balances.insert((token, owner), remaining);
    Ok(())
}

#[async_trait]
impl NonceRead for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn current_nonce(&self, user: Address) -> Result<U256, Self::AdapterError> {
        Ok(self
            .read_state()?
            .nonces
            .get(&user)
            .map(|nonces| nonces.current_nonce)
            .unwrap_or_default())
    }

    async fn min_order_nonce(&self, user: Address) -> Result<U256, Self::AdapterError> {
        Ok(self
            .read_state()?
            .nonces
            .get(&user)
            .map(|nonces| nonces.min_order_nonce)
            .unwrap_or_default())
    }

    async fn is_nonce_executed_or_cancelled(
        &self,
        user: Address,
        nonce: U256,
    ) -> Result<bool, Self::AdapterError> {
        Ok(self
            .read_state()?
            .nonces
            .get(&user)
            .is_some_and(|nonces| nonces.executed_or_cancelled.contains(&nonce)))
    }
}

#[async_trait]
impl NonceStore for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn mark_nonces_executed_or_cancelled(
        &self,
        user: Address,
        nonces: &[U256],
    ) -> Result<(), Self::AdapterError> {
        let mut state = self.write_state()?;
        let user_nonces = state.nonces.entry(user).or_default();
        for &nonce in nonces {
            user_nonces.consume(nonce);
        }
        Ok(())
    }

    async fn update_min_order_nonce(
        &self,
        user: Address,
        min_order_nonce: U256,
    ) -> Result<(), Self::AdapterError> {
        self.write_state()?
            .nonces
            .entry(user)
            .or_default()
            .raise_min_order_nonce(min_order_nonce);
        Ok(())
    }

    async fn increment_current_nonce(&self, user: Address) -> Result<U256, Self::AdapterError> {
        Ok(self
            .write_state()?
            .nonces
            .entry(user)
            .or_default()
            .bump_current_nonce())
    }
}

#[async_trait]
impl CurrencyTransfer for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn transfer_from(
        &self,
        currency: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Self::AdapterError> {
        let mut state = self.write_state()?;
        debit(&mut state.currency_balances, currency, from, amount)?;
        let balance = state.currency_balances.entry((currency, to)).or_default();
        *balance = balance.saturating_add(amount);
        Ok(())
    }
}

#[async_trait]
impl InterfaceProbe for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn supports_interface(
        &self,
        collection: Address,
        interface_id: FixedBytes<4>,
    ) -> Result<bool, Self::AdapterError> {
        Ok(self
            .read_state()?
            .interfaces
            .get(&collection)
            .is_some_and(|ids| ids.contains(&interface_id)))
    }
}

#[async_trait]
impl AssetTransfer for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn safe_transfer_non_fungible(
        &self,
        collection: Address,
        from: Address,
        to: Address,
        token_id: U256,
    ) -> Result<(), Self::AdapterError> {
        {
            let mut state = self.write_state()?;
            match state.token_owners.get(&(collection, token_id)) {
                Some(&owner) if owner == from => {
                    state.token_owners.insert((collection, token_id), to);
                }
                _ => {
                    return Err(InMemoryError::NotOwner {
                        collection,
                        token_id,
                        from,
                    })
                }
            }
        }
        self.after_asset_transfer()
    }

    async fn safe_transfer_semi_fungible(
        &self,
        collection: Address,
        from: Address,
        to: Address,
        token_id: U256,
        amount: U256,
        _data: Bytes,
    ) -> Result<(), Self::AdapterError> {
        {
            let mut state = self.write_state()?;
            let available = state
                .token_balances
                .get(&(collection, token_id, from))
                .copied()
                .unwrap_or_default();
            let remaining =
                available
                    .checked_sub(amount)
                    .ok_or(InMemoryError::InsufficientBalance {
                        token: collection,
                        owner: from,
                        needed: amount,
                        available,
                    })?;
            state
                .token_balances
                .insert((collection, token_id, from), remaining);
            let balance = state
                .token_balances
                .entry((collection, token_id, to))
                .or_default();
            *balance = balance.saturating_add(amount);
        }
        self.after_asset_transfer()
    }
}

#[async_trait]
impl ChainEnvironment for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn chain_id(&self) -> Result<u64, Self::AdapterError> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn block_timestamp(&self) -> Result<u64, Self::AdapterError> {
        if let Some(timestamp) = *self.timestamp.read().map_err(poisoned)? {
            return Ok(timestamp);
        }
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .map_err(|err| InMemoryError::AdapterError {
                error: err.to_string(),
            })
    }
}

#[async_trait]
impl EventEmitter for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn emit(&self, event: ExchangeEvent) -> Result<(), Self::AdapterError> {
        self.write_state()?.events.push(event);
        Ok(())
    }
}

#[async_trait]
impl Transactional for InMemoryContext {
    type AdapterError = InMemoryError;
    type Checkpoint = InMemoryState;

    async fn checkpoint(&self) -> Result<Self::Checkpoint, Self::AdapterError> {
        self.snapshot()
    }

    async fn rollback(&self, checkpoint: Self::Checkpoint) -> Result<(), Self::AdapterError> {
        *self.write_state()? = checkpoint;
        Ok(())
    }
}

#[cfg(test)]
mod memory_context_test {
    use alloy::primitives::address;
    use rstest::*;

    use super::*;

    const CURRENCY: Address = address!("beefbeefbeefbeefbeefbeefbeefbeefbeefbeef");
    const COLLECTION: Address = address!("deaddeaddeaddeaddeaddeaddeaddeaddeaddead");

    #[fixture]
    fn context() -> InMemoryContext {
        InMemoryContext::new(1).with_timestamp(1_000).unwrap()
    }

    #[rstest]
    #[tokio::test]
    async fn currency_transfer_checks_balance(context: InMemoryContext) {
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);
        context.mint_currency(CURRENCY, alice, U256::from(50)).unwrap();

        assert!(matches!(
            context
                .transfer_from(CURRENCY, alice, bob, U256::from(51))
                .await,
            Err(InMemoryError::InsufficientBalance { .. })
        ));
        context
            .transfer_from(CURRENCY, alice, bob, U256::from(20))
            .await
            .unwrap();
        assert_eq!(context.currency_balance(CURRENCY, alice).unwrap(), U256::from(30));
        assert_eq!(context.currency_balance(CURRENCY, bob).unwrap(), U256::from(20));
    }

    #[rstest]
    #[tokio::test]
    async fn non_fungible_transfer_requires_ownership(context: InMemoryContext) {
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);
        context
            .mint_non_fungible(COLLECTION, U256::from(9), alice)
            .unwrap();

        assert!(matches!(
            context
                .safe_transfer_non_fungible(COLLECTION, bob, alice, U256::from(9))
                .await,
            Err(InMemoryError::NotOwner { .. })
        ));
        context
            .safe_transfer_non_fungible(COLLECTION, alice, bob, U256::from(9))
            .await
            .unwrap();
        assert_eq!(
            context.owner_of(COLLECTION, U256::from(9)).unwrap(),
            Some(bob)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn rollback_restores_everything(context: InMemoryContext) {
        let alice = Address::repeat_byte(1);
        let checkpoint = context.checkpoint().await.unwrap();

        context.mint_currency(CURRENCY, alice, U256::from(5)).unwrap();
        context
            .mark_nonces_executed_or_cancelled(alice, &[U256::from(1)])
            .await
            .unwrap();
        context
            .emit(ExchangeEvent::CancelAllOrders {
                user: alice,
                new_min_nonce: U256::from(3),
            })
            .await
            .unwrap();

        context.rollback(checkpoint).await.unwrap();
        assert_eq!(context.currency_balance(CURRENCY, alice).unwrap(), U256::ZERO);
        assert_eq!(context.nonce_state(alice).unwrap(), NonceState::default());
        assert!(context.events().unwrap().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn rejecting_hook_fails_transfer(context: InMemoryContext) {
        let alice = Address::repeat_byte(1);
        context
            .mint_semi_fungible(COLLECTION, U256::from(2), alice, U256::from(4))
            .unwrap();
        context
            .set_asset_transfer_hook(Arc::new(
                |_: &InMemoryContext| -> Result<(), String> { Err("not accepting".to_owned()) },
            ))
            .unwrap();

        assert!(matches!(
            context
                .safe_transfer_semi_fungible(
                    COLLECTION,
                    alice,
                    Address::repeat_byte(2),
                    U256::from(2),
                    U256::from(1),
                    Bytes::new()
                )
                .await,
            Err(InMemoryError::TransferRejected { .. })
        ));
        // The moved unit stays moved until the unit of work rolls back.

        context.clear_asset_transfer_hook().unwrap();
        context
            .safe_transfer_semi_fungible(
                COLLECTION,
                alice,
                Address::repeat_byte(2),
                U256::from(2),
                U256::from(1),
                Bytes::new(),
            )
            .await
            .unwrap();
        assert_eq!(
            context
                .semi_fungible_balance(COLLECTION, U256::from(2), alice)
                .unwrap(),
            U256::from(2)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn chain_and_clock_are_adjustable(context: InMemoryContext) {
        assert_eq!(context.chain_id().await.unwrap(), 1);
        assert_eq!(context.block_timestamp().await.unwrap(), 1_000);

        context.set_chain_id(5);
        context.set_timestamp(2_000).unwrap();
        assert_eq!(context.chain_id().await.unwrap(), 5);
        assert_eq!(context.block_timestamp().await.unwrap(), 2_000);
    }

    #[rstest]
    fn poisoned_clock_is_reported() {
        let context = InMemoryContext::new(1);
        let timestamp = context.timestamp.clone();
        let _ = std::thread::spawn(move || {
            let _guard = timestamp.write().unwrap();
            panic!("poison the clock");
        })
        .join();

        assert!(matches!(
            context.with_timestamp(1_000),
            Err(InMemoryError::AdapterError { .. })
        ));
    }
}
