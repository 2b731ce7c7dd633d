//! REST client for the order backend.
//!
//! Uses `reqwest` with a per-request timeout. Non-2xx responses are decoded
//! from the backend's `{message, code, fieldErrors}` error body and mapped
//! onto [`OrderServiceError`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use food_order_core::{OrderId, OrderStatus, PaymentStatus};

use super::{
    ApiErrorBody, BearerToken, GatewayOrder, Order, OrderDraft, OrderService, OrderServiceError,
    PaymentVerification, PaymentVerificationResponse,
};
use crate::config::OrderServiceConfig;

/// Message used when the backend gives no usable error message.
const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Client for the order backend REST API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpOrderService {
    inner: Arc<HttpOrderServiceInner>,
}

struct HttpOrderServiceInner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOrderService {
    /// Create a new order backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &OrderServiceConfig) -> Result<Self, OrderServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OrderServiceError::Network(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(HttpOrderServiceInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    fn request(&self, method: Method, url: &str, credential: &BearerToken) -> RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .bearer_auth(credential.expose())
    }

    /// Send a request and decode a JSON body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, OrderServiceError> {
        let response = request
            .send()
            .await
            .map_err(|e| OrderServiceError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OrderServiceError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(error_from_response(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse order backend response"
            );
            OrderServiceError::Parse(e.to_string())
        })
    }

    // =========================================================================
    // Admin Methods
    // =========================================================================

    /// Update an order's lifecycle status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, credential), fields(order_id = %order_id, status = %status))]
    pub async fn update_order_status(
        &self,
        credential: &BearerToken,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderServiceError> {
        let url = self.url_with_query(
            &format!("/orders/{order_id}/status"),
            "status",
            status.as_str(),
        )?;
        self.send(self.request(Method::PUT, &url, credential)).await
    }

    /// Update an order's payment status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, credential), fields(order_id = %order_id, payment_status = %payment_status))]
    pub async fn update_payment_status(
        &self,
        credential: &BearerToken,
        order_id: OrderId,
        payment_status: PaymentStatus,
    ) -> Result<Order, OrderServiceError> {
        let url = self.url_with_query(
            &format!("/orders/{order_id}/payment-status"),
            "paymentStatus",
            payment_status.as_str(),
        )?;
        self.send(self.request(Method::PUT, &url, credential)).await
    }

    fn url_with_query(&self, path: &str, key: &str, value: &str) -> Result<String, OrderServiceError> {
        let mut url =
            Url::parse(&self.url(path)).map_err(|e| OrderServiceError::Parse(e.to_string()))?;
        url.query_pairs_mut().append_pair(key, value);
        Ok(url.into())
    }
}

impl OrderService for HttpOrderService {
    #[instrument(skip(self, credential, draft), fields(restaurant_id = %draft.restaurant_id, lines = draft.items.len()))]
    async fn create_order(
        &self,
        credential: &BearerToken,
        draft: &OrderDraft,
    ) -> Result<Order, OrderServiceError> {
        let url = self.url("/orders");
        let order: Order = self
            .send(self.request(Method::POST, &url, credential).json(draft))
            .await?;
        debug!(order_id = %order.id, order_number = %order.order_number, "Order created");
        Ok(order)
    }

    #[instrument(skip(self, credential), fields(order_id = %order_id))]
    async fn create_payment_session(
        &self,
        credential: &BearerToken,
        order_id: OrderId,
    ) -> Result<GatewayOrder, OrderServiceError> {
        let url = self.url(&format!("/payments/create-order/{order_id}"));
        self.send(self.request(Method::POST, &url, credential))
            .await
    }

    #[instrument(skip(self, credential, proof), fields(order_id = %proof.order_id))]
    async fn verify_payment(
        &self,
        credential: &BearerToken,
        proof: &PaymentVerification,
    ) -> Result<Order, OrderServiceError> {
        let url = self.url("/payments/verify");
        let response: PaymentVerificationResponse = self
            .send(self.request(Method::POST, &url, credential).json(proof))
            .await?;

        if !response.is_completed() {
            let message = response
                .message
                .unwrap_or_else(|| format!("payment status {}", response.status));
            warn!(message = %message, "Payment verification rejected");
            return Err(OrderServiceError::Verification(message));
        }

        self.get_order(credential, proof.order_id).await
    }

    #[instrument(skip(self, credential), fields(order_id = %order_id))]
    async fn get_order(
        &self,
        credential: &BearerToken,
        order_id: OrderId,
    ) -> Result<Order, OrderServiceError> {
        let url = self.url(&format!("/orders/{order_id}"));
        self.send(self.request(Method::GET, &url, credential)).await
    }

    #[instrument(skip(self, credential))]
    async fn list_orders(&self, credential: &BearerToken) -> Result<Vec<Order>, OrderServiceError> {
        let url = self.url("/orders/user");
        self.send(self.request(Method::GET, &url, credential)).await
    }
}

/// Map a non-2xx response onto the error taxonomy.
fn error_from_response(status: StatusCode, body: &str) -> OrderServiceError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            OrderServiceError::Validation {
                message,
                field_errors: parsed.field_errors.unwrap_or_default(),
            }
        }
        StatusCode::UNAUTHORIZED => OrderServiceError::AuthRequired,
        StatusCode::FORBIDDEN => OrderServiceError::Forbidden(message),
        StatusCode::NOT_FOUND => OrderServiceError::NotFound(message),
        _ => {
            warn!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Order backend returned non-success status"
            );
            OrderServiceError::Server {
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    use food_order_core::{MenuItemId, PaymentMethod, RestaurantId};

    use super::*;
    use crate::orders::OrderLineRequest;

    fn client(server: &MockServer) -> HttpOrderService {
        HttpOrderService::new(&OrderServiceConfig {
            base_url: Url::parse(&server.url("/api")).unwrap(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn token() -> BearerToken {
        BearerToken::new("test-token")
    }

    fn order_json(id: i64, payment_status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "orderNumber": format!("ORD{id}"),
            "restaurantId": 3,
            "restaurantName": "Spice Route",
            "orderItems": [],
            "subtotal": 200.0,
            "deliveryFee": 5.0,
            "tax": 20.0,
            "total": 225.0,
            "status": "PENDING",
            "paymentStatus": payment_status,
            "paymentMethod": "ONLINE"
        })
    }

    fn draft() -> OrderDraft {
        OrderDraft {
            restaurant_id: RestaurantId::new(3),
            items: vec![OrderLineRequest {
                menu_item_id: MenuItemId::new(11),
                quantity: 2,
                special_instructions: String::new(),
            }],
            delivery_address: "12 Residency Road, Bengaluru".to_string(),
            delivery_phone: "9876543210".to_string(),
            delivery_instructions: String::new(),
            payment_method: PaymentMethod::Online,
        }
    }

    #[tokio::test]
    async fn test_create_order_sends_bearer_and_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/orders")
                    .header("authorization", "Bearer test-token")
                    .json_body_partial(r#"{"restaurantId": 3, "paymentMethod": "ONLINE"}"#);
                then.status(200).json_body(order_json(42, "PENDING"));
            })
            .await;

        let order = client(&server).create_order(&token(), &draft()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(order.id, OrderId::new(42));
        assert_eq!(order.total, Decimal::from(225));
    }

    #[tokio::test]
    async fn test_create_order_maps_field_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/orders");
                then.status(400).json_body(json!({
                    "status": 400,
                    "message": "Please correct the highlighted fields and try again.",
                    "fieldErrors": {"deliveryAddress": "Delivery address must be between 10 and 200 characters"}
                }));
            })
            .await;

        let err = client(&server)
            .create_order(&token(), &draft())
            .await
            .unwrap_err();

        match err {
            OrderServiceError::Validation {
                message,
                field_errors,
            } => {
                assert_eq!(message, "Please correct the highlighted fields and try again.");
                assert!(field_errors.contains_key("deliveryAddress"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders/1");
                then.status(401);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders/2");
                then.status(403).json_body(json!({"message": "Access denied"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders/3");
                then.status(404).json_body(json!({"message": "Order not found"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders/4");
                then.status(503).body("upstream unavailable");
            })
            .await;

        let client = client(&server);
        let get = |id| {
            let client = client.clone();
            async move { client.get_order(&token(), OrderId::new(id)).await.unwrap_err() }
        };

        assert!(matches!(get(1).await, OrderServiceError::AuthRequired));
        assert!(matches!(get(2).await, OrderServiceError::Forbidden(m) if m == "Access denied"));
        assert!(matches!(get(3).await, OrderServiceError::NotFound(m) if m == "Order not found"));
        match get(4).await {
            OrderServiceError::Server { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, GENERIC_ERROR_MESSAGE);
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_network_error_when_backend_unreachable() {
        let client = HttpOrderService::new(&OrderServiceConfig {
            base_url: Url::parse("http://127.0.0.1:9/api").unwrap(),
            timeout_secs: 2,
        })
        .unwrap();

        let err = client.list_orders(&token()).await.unwrap_err();
        assert!(matches!(err, OrderServiceError::Network(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_create_payment_session() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/payments/create-order/42");
                then.status(200).json_body(json!({
                    "orderId": "order_N5b1",
                    "amount": 225.0,
                    "currency": "INR",
                    "keyId": "rzp_test_key"
                }));
            })
            .await;

        let session = client(&server)
            .create_payment_session(&token(), OrderId::new(42))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(session.order_id, "order_N5b1");
        assert_eq!(session.amount, Decimal::from(225));
        assert_eq!(session.currency, "INR");
        assert_eq!(session.key_id, "rzp_test_key");
    }

    #[tokio::test]
    async fn test_verify_payment_fetches_confirmed_order() {
        let server = MockServer::start_async().await;
        let verify = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/payments/verify")
                    .json_body_partial(r#"{"orderId": 42, "razorpayPaymentId": "pay_1"}"#);
                then.status(200).json_body(json!({
                    "razorpayOrderId": "order_N5b1",
                    "razorpayPaymentId": "pay_1",
                    "status": "COMPLETED",
                    "message": "Payment processed successfully",
                    "amount": 225.0,
                    "currency": "INR"
                }));
            })
            .await;
        let fetch = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders/42");
                then.status(200).json_body(order_json(42, "COMPLETED"));
            })
            .await;

        let proof = PaymentVerification {
            order_id: OrderId::new(42),
            payment_method: PaymentMethod::Online,
            gateway_order_id: "order_N5b1".to_string(),
            gateway_payment_id: "pay_1".to_string(),
            signature: "sig".to_string(),
        };
        let order = client(&server).verify_payment(&token(), &proof).await.unwrap();

        verify.assert_async().await;
        fetch.assert_async().await;
        assert_eq!(order.payment_status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn test_verify_payment_failed_status_is_verification_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/payments/verify");
                then.status(200).json_body(json!({
                    "status": "FAILED",
                    "message": "Payment signature verification failed"
                }));
            })
            .await;
        let fetch = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders/42");
                then.status(200).json_body(order_json(42, "PENDING"));
            })
            .await;

        let proof = PaymentVerification {
            order_id: OrderId::new(42),
            payment_method: PaymentMethod::Online,
            gateway_order_id: "order_N5b1".to_string(),
            gateway_payment_id: "pay_1".to_string(),
            signature: "forged".to_string(),
        };
        let err = client(&server)
            .verify_payment(&token(), &proof)
            .await
            .unwrap_err();

        assert!(
            matches!(err, OrderServiceError::Verification(m) if m == "Payment signature verification failed")
        );
        assert_eq!(fetch.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_admin_status_updates_use_query_parameters() {
        let server = MockServer::start_async().await;
        let status_mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/orders/42/status")
                    .query_param("status", "OUT_FOR_DELIVERY");
                then.status(200).json_body(order_json(42, "PENDING"));
            })
            .await;
        let payment_mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/orders/42/payment-status")
                    .query_param("paymentStatus", "REFUNDED");
                then.status(200).json_body(order_json(42, "REFUNDED"));
            })
            .await;

        let client = client(&server);
        client
            .update_order_status(&token(), OrderId::new(42), OrderStatus::OutForDelivery)
            .await
            .unwrap();
        let order = client
            .update_payment_status(&token(), OrderId::new(42), PaymentStatus::Refunded)
            .await
            .unwrap();

        status_mock.assert_async().await;
        payment_mock.assert_async().await;
        assert_eq!(order.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_unparseable_success_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders/user");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let err = client(&server).list_orders(&token()).await.unwrap_err();
        assert!(matches!(err, OrderServiceError::Parse(_)));
    }
}
