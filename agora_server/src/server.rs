// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

use std::{str::FromStr, sync::Arc};

use agora_core::{
    digest::order_struct_hash,
    exchange::{context::memory::InMemoryContext, Exchange},
    settlement::Fulfillment,
    signed_message::Eip712SignedMessage,
    Error,
};
use agora_order::{
    Order, SignedCancelAllOrders, SignedCancelOrders, SignedFillOrder, SignedIncrementNonce,
};
use alloy::{
    dyn_abi::Eip712Domain,
    primitives::{Address, Bytes, U256},
    sol_types::SolStruct,
};
use anyhow::{Context, Result};
use axum::{
    error_handling::HandleError, http::StatusCode, routing::post_service, BoxError, Router,
};
use jsonrpsee::{
    core::async_trait,
    proc_macros::rpc,
    server::{stop_channel, ServerBuilder, ServerConfig},
};
use lazy_static::lazy_static;
use log::{error, info, warn};
use prometheus::{register_int_counter, IntCounter};
use tokio::{net::TcpListener, signal, sync::Mutex, task::JoinHandle};

pub use crate::{
    api_versioning::{AgoraRpcApiVersion, AgoraRpcApiVersionsInfo},
    jsonrpsee_helpers::JsonRpcResponse,
};
use crate::{
    api_versioning::{agora_rpc_api_versions_info, AGORA_RPC_API_VERSIONS_DEPRECATED},
    error_codes::JsonRpcErrorCode,
    jsonrpsee_helpers::{json_rpc_error, JsonRpcError, JsonRpcResult, JsonRpcWarning},
};

// Register the metrics into the global metrics registry.
lazy_static! {
    static ref ORDERS_FULFILLED: IntCounter = register_int_counter!(
        "orders_fulfilled_count",
        "Number of orders settled through the service."
    )
    .unwrap();
    static ref FULFILLMENT_FAILURES: IntCounter = register_int_counter!(
        "fulfillment_failure_count",
        "Number of failed fulfillment requests (for any reason)."
    )
    .unwrap();
    static ref ORDER_NONCES_CANCELLED: IntCounter = register_int_counter!(
        "order_nonces_cancelled_count",
        "Number of order nonces cancelled individually."
    )
    .unwrap();
    static ref BULK_CANCELLATIONS: IntCounter = register_int_counter!(
        "bulk_cancellation_count",
        "Number of successful bulk cancellations."
    )
    .unwrap();
    static ref DEPRECATION_WARNING_COUNT: IntCounter = register_int_counter!(
        "deprecation_warning_count",
        "Number of deprecation warnings sent to clients."
    )
    .unwrap();
    static ref VERSION_ERROR_COUNT: IntCounter = register_int_counter!(
        "version_error_count",
        "Number of API version errors sent to clients."
    )
    .unwrap();
}

/// Generates the `RpcServer` trait that is used to define the JSON-RPC API.
///
/// The `rpc` macro does not carry this documentation over to the generated trait, the
/// JSON-RPC API is documented in `agora_server/README.md` instead. Keep both in sync.
#[rpc(server)]
pub trait Rpc {
    /// Returns the versions of the Agora JSON-RPC API implemented by this server.
    #[method(name = "api_versions")]
    fn api_versions(&self) -> JsonRpcResult<AgoraRpcApiVersionsInfo>;

    /// Returns the EIP-712 domain orders and caller authorizations must be signed for.
    #[method(name = "eip712domain_info")]
    async fn eip712_domain_info(&self) -> JsonRpcResult<Eip712Domain>;

    /// Settles `order` against the signer of `authorization`.
    #[method(name = "fulfill_order")]
    async fn fulfill_order(
        &self,
        api_version: String,
        order: Order,
        signature: Bytes,
        authorization: SignedFillOrder,
    ) -> JsonRpcResult<Fulfillment>;

    #[method(name = "cancel_multiple_orders")]
    async fn cancel_multiple_orders(
        &self,
        api_version: String,
        request: SignedCancelOrders,
    ) -> JsonRpcResult<()>;

    #[method(name = "cancel_all_orders_for_sender")]
    async fn cancel_all_orders_for_sender(
        &self,
        api_version: String,
        request: SignedCancelAllOrders,
    ) -> JsonRpcResult<()>;

    /// Owner only. Returns the new counter value.
    #[method(name = "increment_current_nonce")]
    async fn increment_current_nonce(
        &self,
        api_version: String,
        request: SignedIncrementNonce,
    ) -> JsonRpcResult<U256>;

    #[method(name = "current_nonce")]
    async fn current_nonce(&self, user: Address) -> JsonRpcResult<U256>;

    #[method(name = "min_order_nonce")]
    async fn min_order_nonce(&self, user: Address) -> JsonRpcResult<U256>;

    #[method(name = "is_user_order_nonce_executed_or_cancelled")]
    async fn is_user_order_nonce_executed_or_cancelled(
        &self,
        user: Address,
        nonce: U256,
    ) -> JsonRpcResult<bool>;
}

#[derive(Clone)]
struct RpcImpl {
    exchange: Arc<Exchange<InMemoryContext>>,
    /// Makes the stale counter check and the increment a single step.
    admin: Arc<Mutex<()>>,
}

/// Checks that the given API version is supported.
/// Returns the warnings to attach to the response, or an error if the version is unknown.
fn check_api_version(api_version: &str) -> Result<Vec<JsonRpcWarning>, JsonRpcError> {
    let api_version = AgoraRpcApiVersion::from_str(api_version).map_err(|_| {
        VERSION_ERROR_COUNT.inc();
        json_rpc_error(
            JsonRpcErrorCode::InvalidVersion,
            format!("Unsupported API version: \"{api_version}\"."),
            Some(agora_rpc_api_versions_info()),
        )
    })?;

    let mut warnings = Vec::new();
    if AGORA_RPC_API_VERSIONS_DEPRECATED.contains(&api_version) {
        DEPRECATION_WARNING_COUNT.inc();
        warnings.push(JsonRpcWarning::deprecated_version(&api_version));
    }
    Ok(warnings)
}

/// Maps an exchange failure to its JSON-RPC error. Nonce rule violations carry the
/// violated rule as `data`.
fn exchange_error(error: Error) -> JsonRpcError {
    let code = JsonRpcErrorCode::from(&error);
    match &error {
        Error::InvalidNonce { reason, .. } => json_rpc_error(code, error.to_string(), Some(reason)),
        _ => json_rpc_error(code, error.to_string(), None::<()>),
    }
}

fn invalid_request(message: String) -> JsonRpcError {
    json_rpc_error(JsonRpcErrorCode::InvalidRequest, message, None::<()>)
}

impl RpcImpl {
    async fn domain_separator(&self) -> Result<Eip712Domain, JsonRpcError> {
        self.exchange
            .domain_separator()
            .await
            .map_err(exchange_error)
    }

    /// The caller of a request is the signer of its authorization.
    async fn caller<M: SolStruct>(
        &self,
        authorization: &Eip712SignedMessage<M>,
    ) -> Result<Address, JsonRpcError> {
        let domain_separator = self.domain_separator().await?;
        authorization
            .recover_signer(&domain_separator)
            .map_err(|e| invalid_request(format!("Invalid caller authorization: {e}")))
    }

    async fn fulfill_order_(
        &self,
        api_version: String,
        order: Order,
        signature: Bytes,
        authorization: SignedFillOrder,
    ) -> JsonRpcResult<Fulfillment> {
        let warnings = check_api_version(&api_version)?;

        let order_hash = order_struct_hash(&order);
        if authorization.message.orderHash != order_hash {
            return Err(invalid_request(format!(
                "Authorization is for order {}, not {order_hash}",
                authorization.message.orderHash
            )));
        }
        let caller = self.caller(&authorization).await?;

        let fulfillment = self
            .exchange
            .fulfill_order_with_signature(order, &signature, caller)
            .await
            .map_err(exchange_error)?;
        Ok(JsonRpcResponse::with_warnings(fulfillment, warnings))
    }
}

#[async_trait]
impl RpcServer for RpcImpl {
    fn api_versions(&self) -> JsonRpcResult<AgoraRpcApiVersionsInfo> {
        Ok(JsonRpcResponse::ok(agora_rpc_api_versions_info()))
    }

    async fn eip712_domain_info(&self) -> JsonRpcResult<Eip712Domain> {
        Ok(JsonRpcResponse::ok(self.domain_separator().await?))
    }

    async fn fulfill_order(
        &self,
        api_version: String,
        order: Order,
        signature: Bytes,
        authorization: SignedFillOrder,
    ) -> JsonRpcResult<Fulfillment> {
        match self
            .fulfill_order_(api_version, order, signature, authorization)
            .await
        {
            Ok(res) => {
                ORDERS_FULFILLED.inc();
                Ok(res)
            }
            Err(e) => {
                FULFILLMENT_FAILURES.inc();
                warn!("Fulfillment rejected: {}", e.message());
                Err(e)
            }
        }
    }

    async fn cancel_multiple_orders(
        &self,
        api_version: String,
        request: SignedCancelOrders,
    ) -> JsonRpcResult<()> {
        let warnings = check_api_version(&api_version)?;
        let caller = self.caller(&request).await?;
        let order_nonces = &request.message.orderNonces;

        self.exchange
            .cancel_multiple_orders(caller, order_nonces)
            .await
            .map_err(exchange_error)?;
        ORDER_NONCES_CANCELLED.inc_by(order_nonces.len() as u64);
        Ok(JsonRpcResponse::with_warnings((), warnings))
    }

    async fn cancel_all_orders_for_sender(
        &self,
        api_version: String,
        request: SignedCancelAllOrders,
    ) -> JsonRpcResult<()> {
        let warnings = check_api_version(&api_version)?;
        let caller = self.caller(&request).await?;

        self.exchange
            .cancel_all_orders_for_sender(caller, request.message.minNonce)
            .await
            .map_err(exchange_error)?;
        BULK_CANCELLATIONS.inc();
        Ok(JsonRpcResponse::with_warnings((), warnings))
    }

    async fn increment_current_nonce(
        &self,
        api_version: String,
        request: SignedIncrementNonce,
    ) -> JsonRpcResult<U256> {
        let warnings = check_api_version(&api_version)?;
        let caller = self.caller(&request).await?;
        let user = request.message.user;

        let _admin = self.admin.lock().await;
        let current_nonce = self
            .exchange
            .current_nonce(user)
            .await
            .map_err(exchange_error)?;
        if current_nonce != request.message.currentNonce {
            return Err(invalid_request(format!(
                "Stale request: current nonce of {user} is {current_nonce}, not {}",
                request.message.currentNonce
            )));
        }

        let new_nonce = self
            .exchange
            .increment_current_nonce(caller, user)
            .await
            .map_err(exchange_error)?;
        Ok(JsonRpcResponse::with_warnings(new_nonce, warnings))
    }

    async fn current_nonce(&self, user: Address) -> JsonRpcResult<U256> {
        self.exchange
            .current_nonce(user)
            .await
            .map(JsonRpcResponse::ok)
            .map_err(exchange_error)
    }

    async fn min_order_nonce(&self, user: Address) -> JsonRpcResult<U256> {
        self.exchange
            .min_order_nonce(user)
            .await
            .map(JsonRpcResponse::ok)
            .map_err(exchange_error)
    }

    async fn is_user_order_nonce_executed_or_cancelled(
        &self,
        user: Address,
        nonce: U256,
    ) -> JsonRpcResult<bool> {
        self.exchange
            .is_user_order_nonce_executed_or_cancelled(user, nonce)
            .await
            .map(JsonRpcResponse::ok)
            .map_err(exchange_error)
    }
}

pub async fn run_server(
    port: u16,
    exchange: Arc<Exchange<InMemoryContext>>,
    max_request_body_size: u32,
    max_response_body_size: u32,
    max_concurrent_connections: u32,
) -> Result<(JoinHandle<()>, std::net::SocketAddr)> {
    // Setting up the JSON RPC server
    let rpc_impl = RpcImpl {
        exchange,
        admin: Arc::new(Mutex::new(())),
    };
    let config = ServerConfig::builder()
        .max_request_body_size(max_request_body_size)
        .max_response_body_size(max_response_body_size)
        .max_connections(max_concurrent_connections)
        .http_only()
        .build();
    let (stop_handle, server_handle) = stop_channel();
    let json_rpc_service = ServerBuilder::new()
        .set_config(config)
        .to_service_builder()
        .build(rpc_impl.into_rpc(), stop_handle);

    async fn handle_anyhow_error(err: BoxError) -> (StatusCode, String) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Something went wrong: {err}"),
        )
    }
    let router = Router::new().route_service(
        "/",
        HandleError::new(post_service(json_rpc_service), handle_anyhow_error),
    );

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind to agora-server port {port}"))?;

    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        // Dropping the handle would stop the JSON-RPC service.
        let _server_handle = server_handle;
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_handler())
            .await
        {
            error!("Agora server error: {e}");
        }
    });

    Ok((handle, addr))
}

/// Graceful shutdown handler
async fn shutdown_handler() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, starting graceful shutdown");
}
