// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! Initial ledger of the in-memory exchange, loaded from a JSON file.
//!
//! ```json
//! {
//!   "currencies": [{ "currency": "0x…", "owner": "0x…", "amount": "0x3e8" }],
//!   "collections": [{ "address": "0x…", "kind": "non_fungible" }],
//!   "non_fungible_tokens": [{ "collection": "0x…", "token_id": "0x1", "owner": "0x…" }],
//!   "semi_fungible_tokens": [{ "collection": "0x…", "token_id": "0x1", "owner": "0x…", "amount": "0xa" }]
//! }
//! ```
//!
//! Every section is optional.

use std::{fs, path::Path};

use agora_core::{
    asset::AssetKind,
    exchange::context::memory::{InMemoryContext, InMemoryError},
};
use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Genesis {
    #[serde(default)]
    pub currencies: Vec<CurrencyBalance>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub non_fungible_tokens: Vec<NonFungibleToken>,
    #[serde(default)]
    pub semi_fungible_tokens: Vec<SemiFungibleBalance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrencyBalance {
    pub currency: Address,
    pub owner: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Collection {
    pub address: Address,
    pub kind: AssetKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NonFungibleToken {
    pub collection: Address,
    pub token_id: U256,
    pub owner: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SemiFungibleBalance {
    pub collection: Address,
    pub token_id: U256,
    pub owner: Address,
    pub amount: U256,
}

impl Genesis {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read genesis file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse genesis file {}", path.display()))
    }

    /// Seeds `context` with every balance and token of the genesis.
    pub fn apply(&self, context: &InMemoryContext) -> Result<(), InMemoryError> {
        for balance in &self.currencies {
            context.mint_currency(balance.currency, balance.owner, balance.amount)?;
        }
        for collection in &self.collections {
            context.register_collection(collection.address, collection.kind)?;
        }
        for token in &self.non_fungible_tokens {
            context.mint_non_fungible(token.collection, token.token_id, token.owner)?;
        }
        for balance in &self.semi_fungible_tokens {
            context.mint_semi_fungible(
                balance.collection,
                balance.token_id,
                balance.owner,
                balance.amount,
            )?;
        }
        Ok(())
    }
}
