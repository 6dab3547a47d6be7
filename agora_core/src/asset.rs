// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Asset transfer dispatch
//!
//! Collections advertise which transfer convention they implement through an ERC165
//! style capability probe. The probe runs once per transfer and always in the same
//! order, non-fungible first, so a collection reporting both interfaces is treated as
//! non-fungible.

use alloy::primitives::{fixed_bytes, Address, Bytes, FixedBytes, U256};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    exchange::adapters::{AssetTransfer, InterfaceProbe},
    Error, Result,
};

/// ERC721 interface id.
pub const INTERFACE_ID_ERC721: FixedBytes<4> = fixed_bytes!("80ac58cd");

/// ERC1155 interface id.
pub const INTERFACE_ID_ERC1155: FixedBytes<4> = fixed_bytes!("d9b67a26");

/// Transfer convention of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Single-unit tokens (ERC721). The order amount is not used for the transfer.
    NonFungible,
    /// Quantity-aware tokens (ERC1155).
    SemiFungible,
}

impl AssetKind {
    pub fn interface_id(&self) -> FixedBytes<4> {
        match self {
            AssetKind::NonFungible => INTERFACE_ID_ERC721,
            AssetKind::SemiFungible => INTERFACE_ID_ERC1155,
        }
    }

    /// Probes `collection` and returns its transfer convention.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTokenAmount`] if the collection supports neither
    /// convention, and [`Error::AdapterError`] if the probe itself fails.
    pub async fn resolve<P>(probe: &P, collection: Address) -> Result<Self>
    where
        P: InterfaceProbe + Sync,
    {
        for kind in [AssetKind::NonFungible, AssetKind::SemiFungible] {
            if probe
                .supports_interface(collection, kind.interface_id())
                .await
                .map_err(Error::adapter)?
            {
                return Ok(kind);
            }
        }
        Err(Error::InvalidTokenAmount { collection })
    }
}

/// Moves `amount` of `token_id` from `from` to `to` with the convention `collection`
/// supports. Returns the convention used.
pub async fn transfer_asset<C>(
    context: &C,
    collection: Address,
    from: Address,
    to: Address,
    token_id: U256,
    amount: U256,
) -> Result<AssetKind>
where
    C: InterfaceProbe + AssetTransfer + Sync,
{
    let kind = AssetKind::resolve(context, collection).await?;
    debug!("Transferring {kind:?} token {token_id} of {collection} from {from} to {to}");

    let transfer = match kind {
        AssetKind::NonFungible => {
            context
                .safe_transfer_non_fungible(collection, from, to, token_id)
                .await
        }
        AssetKind::SemiFungible => {
            context
                .safe_transfer_semi_fungible(collection, from, to, token_id, amount, Bytes::new())
                .await
        }
    };
    transfer.map_err(|err| Error::AssetTransferFailed {
        source_error: anyhow::Error::new(err),
    })?;

    Ok(kind)
}
