// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

use std::{fmt::Debug, sync::Arc};

use agora_core::{
    agora_eip712_domain,
    asset::AssetKind,
    digest::order_struct_hash,
    exchange::{context::memory::InMemoryContext, Exchange},
    settlement::Fulfillment,
    signed_message::Eip712SignedMessage,
};
use agora_order::{CancelAllOrders, CancelOrders, FillOrder, IncrementNonce, Order};
use agora_server::{
    api_versioning::AgoraRpcApiVersionsInfo,
    error_codes::JsonRpcErrorCode,
    genesis::{Collection, CurrencyBalance, Genesis, NonFungibleToken},
    jsonrpsee_helpers::JsonRpcResponse,
    server,
};
use alloy::{
    dyn_abi::Eip712Domain,
    primitives::{address, Address, Bytes, U256},
    signers::local::PrivateKeySigner,
};
use jsonrpsee::{
    core::client::{ClientT, Error as ClientError},
    http_client::{HttpClient, HttpClientBuilder},
    rpc_params,
};
use rstest::*;
use tokio::task::JoinHandle;

const API_VERSION: &str = "0.1";
const CHAIN_ID: u64 = 1;
const NOW: u64 = 1_700_000_000;
const VERIFYING_CONTRACT: Address = address!("1111111111111111111111111111111111111111");
const CURRENCY: Address = address!("beefbeefbeefbeefbeefbeefbeefbeefbeefbeef");
const NFT: Address = address!("deaddeaddeaddeaddeaddeaddeaddeaddeaddead");

struct ServiceFixture {
    handle: JoinHandle<()>,
    client: HttpClient,
    owner: PrivateKeySigner,
    maker: PrivateKeySigner,
    taker: PrivateKeySigner,
}

impl ServiceFixture {
    fn domain_separator(&self) -> Eip712Domain {
        agora_eip712_domain(CHAIN_ID, VERIFYING_CONTRACT)
    }

    /// Ask by the maker for NFT #1 at price 100.
    fn ask(&self, nonce: u64) -> Order {
        Order::ask(self.maker.address(), NFT, U256::from(1), CURRENCY, U256::from(100))
            .unwrap()
            .with_window(NOW - 60, NOW + 60)
            .with_nonce(U256::from(nonce))
    }

    fn order_signature(&self, order: &Order) -> Bytes {
        let signed = Eip712SignedMessage::new(&self.domain_separator(), order.clone(), &self.maker)
            .unwrap();
        Bytes::from(signed.signature.as_bytes().to_vec())
    }

    fn fill_authorization(&self, order: &Order) -> Eip712SignedMessage<FillOrder> {
        Eip712SignedMessage::new(
            &self.domain_separator(),
            FillOrder {
                orderHash: order_struct_hash(order),
            },
            &self.taker,
        )
        .unwrap()
    }

    async fn fulfill(&self, order: &Order) -> Result<JsonRpcResponse<Fulfillment>, ClientError> {
        self.client
            .request(
                "fulfill_order",
                rpc_params!(
                    API_VERSION,
                    order,
                    self.order_signature(order),
                    self.fill_authorization(order)
                ),
            )
            .await
    }

    async fn nonce_used(&self, nonce: u64) -> bool {
        let res: JsonRpcResponse<bool> = self
            .client
            .request(
                "is_user_order_nonce_executed_or_cancelled",
                rpc_params!(self.maker.address(), U256::from(nonce)),
            )
            .await
            .unwrap();
        res.data
    }
}

impl Drop for ServiceFixture {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn error_code<T: Debug>(result: Result<T, ClientError>) -> i32 {
    match result {
        Err(ClientError::Call(error)) => error.code(),
        other => panic!("expected a call error, got {other:?}"),
    }
}

#[fixture]
async fn service() -> ServiceFixture {
    let owner = PrivateKeySigner::random();
    let maker = PrivateKeySigner::random();
    let taker = PrivateKeySigner::random();

    let context = InMemoryContext::new(CHAIN_ID).with_timestamp(NOW).unwrap();
    Genesis {
        currencies: vec![CurrencyBalance {
            currency: CURRENCY,
            owner: taker.address(),
            amount: U256::from(1_000),
        }],
        collections: vec![Collection {
            address: NFT,
            kind: AssetKind::NonFungible,
        }],
        non_fungible_tokens: vec![NonFungibleToken {
            collection: NFT,
            token_id: U256::from(1),
            owner: maker.address(),
        }],
        semi_fungible_tokens: Vec::new(),
    }
    .apply(&context)
    .unwrap();

    let exchange = Arc::new(Exchange::new(
        context,
        VERIFYING_CONTRACT,
        owner.address(),
    ));
    let (handle, local_addr) = server::run_server(0, exchange, 100 * 1024, 100 * 1024, 4)
        .await
        .unwrap();
    let client = HttpClientBuilder::default()
        .build(format!("http://127.0.0.1:{}", local_addr.port()))
        .unwrap();

    ServiceFixture {
        handle,
        client,
        owner,
        maker,
        taker,
    }
}

#[rstest]
#[tokio::test]
async fn reports_versions_and_domain(#[future] service: ServiceFixture) {
    let service = service.await;

    let versions: JsonRpcResponse<AgoraRpcApiVersionsInfo> = service
        .client
        .request("api_versions", rpc_params!())
        .await
        .unwrap();
    assert_eq!(versions.data.versions_supported.len(), 1);

    let domain: JsonRpcResponse<Eip712Domain> = service
        .client
        .request("eip712domain_info", rpc_params!())
        .await
        .unwrap();
    assert_eq!(domain.data.separator(), service.domain_separator().separator());
}

#[rstest]
#[tokio::test]
async fn order_is_fulfilled_once(#[future] service: ServiceFixture) {
    let service = service.await;
    let order = service.ask(7);

    let res = service.fulfill(&order).await.unwrap();
    assert!(res.warnings.is_none());
    assert_eq!(res.data.seller, service.maker.address());
    assert_eq!(res.data.buyer, service.taker.address());
    assert_eq!(res.data.price, U256::from(100));
    assert!(service.nonce_used(7).await);

    assert_eq!(
        error_code(service.fulfill(&order).await),
        JsonRpcErrorCode::InvalidNonce as i32
    );
}

#[rstest]
#[tokio::test]
async fn unsupported_api_version(#[future] service: ServiceFixture) {
    let service = service.await;
    let order = service.ask(1);
    let result: Result<JsonRpcResponse<Fulfillment>, _> = service
        .client
        .request(
            "fulfill_order",
            rpc_params!(
                "0.0",
                &order,
                service.order_signature(&order),
                service.fill_authorization(&order)
            ),
        )
        .await;
    assert_eq!(error_code(result), JsonRpcErrorCode::InvalidVersion as i32);
    assert!(!service.nonce_used(1).await);
}

#[rstest]
#[tokio::test]
async fn authorization_must_match_order(#[future] service: ServiceFixture) {
    let service = service.await;
    let order = service.ask(1);
    let other = service.ask(2);
    let result: Result<JsonRpcResponse<Fulfillment>, _> = service
        .client
        .request(
            "fulfill_order",
            rpc_params!(
                API_VERSION,
                &order,
                service.order_signature(&order),
                service.fill_authorization(&other)
            ),
        )
        .await;
    assert_eq!(error_code(result), JsonRpcErrorCode::InvalidRequest as i32);
}

#[rstest]
#[tokio::test]
async fn malformed_order_signature(#[future] service: ServiceFixture) {
    let service = service.await;
    let order = service.ask(1);
    let truncated = Bytes::from(service.order_signature(&order)[..64].to_vec());
    let result: Result<JsonRpcResponse<Fulfillment>, _> = service
        .client
        .request(
            "fulfill_order",
            rpc_params!(
                API_VERSION,
                &order,
                truncated,
                service.fill_authorization(&order)
            ),
        )
        .await;
    assert_eq!(error_code(result), JsonRpcErrorCode::InvalidSignature as i32);
}

#[rstest]
#[tokio::test]
async fn maker_cancels_orders(#[future] service: ServiceFixture) {
    let service = service.await;
    let domain_separator = service.domain_separator();

    let cancel = Eip712SignedMessage::new(
        &domain_separator,
        CancelOrders {
            orderNonces: vec![U256::from(3), U256::from(3)],
        },
        &service.maker,
    )
    .unwrap();
    let _: JsonRpcResponse<()> = service
        .client
        .request("cancel_multiple_orders", rpc_params!(API_VERSION, cancel))
        .await
        .unwrap();
    assert!(service.nonce_used(3).await);
    assert_eq!(
        error_code(service.fulfill(&service.ask(3)).await),
        JsonRpcErrorCode::InvalidNonce as i32
    );

    let cancel_all = Eip712SignedMessage::new(
        &domain_separator,
        CancelAllOrders {
            minNonce: U256::from(10),
        },
        &service.maker,
    )
    .unwrap();
    let _: JsonRpcResponse<()> = service
        .client
        .request(
            "cancel_all_orders_for_sender",
            rpc_params!(API_VERSION, &cancel_all),
        )
        .await
        .unwrap();
    let min: JsonRpcResponse<U256> = service
        .client
        .request("min_order_nonce", rpc_params!(service.maker.address()))
        .await
        .unwrap();
    assert_eq!(min.data, U256::from(10));

    // Replaying the bulk cancellation no longer raises the minimum.
    let replay: Result<JsonRpcResponse<()>, _> = service
        .client
        .request(
            "cancel_all_orders_for_sender",
            rpc_params!(API_VERSION, &cancel_all),
        )
        .await;
    assert_eq!(error_code(replay), JsonRpcErrorCode::InvalidNonce as i32);
}

#[rstest]
#[tokio::test]
async fn owner_increments_current_nonce(#[future] service: ServiceFixture) {
    let service = service.await;
    let domain_separator = service.domain_separator();
    let user = service.maker.address();
    let increment = |current: u64, signer: &PrivateKeySigner| {
        Eip712SignedMessage::new(
            &domain_separator,
            IncrementNonce {
                user,
                currentNonce: U256::from(current),
            },
            signer,
        )
        .unwrap()
    };

    let denied: Result<JsonRpcResponse<U256>, _> = service
        .client
        .request(
            "increment_current_nonce",
            rpc_params!(API_VERSION, increment(0, &service.maker)),
        )
        .await;
    assert_eq!(error_code(denied), JsonRpcErrorCode::Unauthorized as i32);

    let res: JsonRpcResponse<U256> = service
        .client
        .request(
            "increment_current_nonce",
            rpc_params!(API_VERSION, increment(0, &service.owner)),
        )
        .await
        .unwrap();
    assert_eq!(res.data, U256::from(1));

    let stale: Result<JsonRpcResponse<U256>, _> = service
        .client
        .request(
            "increment_current_nonce",
            rpc_params!(API_VERSION, increment(0, &service.owner)),
        )
        .await;
    assert_eq!(error_code(stale), JsonRpcErrorCode::InvalidRequest as i32);

    let current: JsonRpcResponse<U256> = service
        .client
        .request("current_nonce", rpc_params!(user))
        .await
        .unwrap();
    assert_eq!(current.data, U256::from(1));
}
