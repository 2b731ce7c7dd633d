//! Integration tests for the food order storefront.
//!
//! Each test starts the storefront in-process on an ephemeral port, with the
//! order backend replaced by an [`httpmock::MockServer`], and drives it over
//! real HTTP the way the browser would: a cookie-carrying client for the
//! session and a bearer header for the shopper's credential.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p food-order-integration-tests
//! ```

use std::net::IpAddr;
use std::time::Duration;

use httpmock::MockServer;
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

use food_order_storefront::config::{OrderServiceConfig, StorefrontConfig};
use food_order_storefront::pricing::PricingConfig;
use food_order_storefront::{routes, state::AppState};

/// Bearer token the tests sign in with.
pub const TEST_TOKEN: &str = "integration-token";

/// Login URL the storefront redirects to on 401.
pub const LOGIN_URL: &str = "/login";

/// How long [`TestStorefront::wait_for_state`] polls before giving up.
const STATE_WAIT: Duration = Duration::from_secs(5);

/// A running storefront plus its mocked order backend.
pub struct TestStorefront {
    pub backend: MockServer,
    pub client: Client,
    base_url: String,
    server: JoinHandle<()>,
}

impl TestStorefront {
    /// Start a storefront with the default 15 minute payment timeout.
    pub async fn start() -> Self {
        Self::start_with_payment_timeout(Some(Duration::from_secs(900))).await
    }

    /// Start a storefront with the given payment timeout.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot be started.
    pub async fn start_with_payment_timeout(payment_timeout: Option<Duration>) -> Self {
        let backend = MockServer::start_async().await;

        let config = StorefrontConfig {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            base_url: "http://localhost".to_string(),
            login_url: LOGIN_URL.to_string(),
            order_service: OrderServiceConfig {
                base_url: Url::parse(&backend.url("/api")).expect("mock backend URL"),
                timeout_secs: 5,
            },
            pricing: PricingConfig::default(),
            payment_timeout,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let state = AppState::new(config).expect("Failed to build application state");
        let app = routes::router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("listener address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            backend,
            client,
            base_url: format!("http://{addr}"),
            server,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Add one unit of a menu item from restaurant 3.
    pub async fn add_item(&self, menu_item_id: i64, name: &str, price: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/cart/items"))
            .json(&json!({
                "restaurant_id": 3,
                "restaurant_name": "Spice Route",
                "menu_item": { "id": menu_item_id, "name": name, "price": price }
            }))
            .send()
            .await
            .expect("Failed to add item");
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json().await.expect("cart body")
    }

    /// Current cart view.
    pub async fn cart(&self) -> Value {
        self.get_json("/cart").await
    }

    /// Submit the checkout with valid delivery details.
    pub async fn submit(&self, payment_method: &str) -> Response {
        self.client
            .post(self.url("/checkout"))
            .bearer_auth(TEST_TOKEN)
            .json(&json!({
                "delivery_address": "12 Residency Road, Bengaluru",
                "delivery_phone": "9876543210",
                "delivery_instructions": "Ring the bell",
                "payment_method": payment_method
            }))
            .send()
            .await
            .expect("Failed to submit checkout")
    }

    /// Current checkout, raw.
    pub async fn checkout(&self) -> Response {
        self.client
            .get(self.url("/checkout"))
            .send()
            .await
            .expect("Failed to fetch checkout")
    }

    /// Poll the checkout until `done` accepts it.
    ///
    /// # Panics
    ///
    /// Panics if the checkout does not get there in time.
    pub async fn wait_for_state(&self, done: impl Fn(&Value) -> bool) -> Value {
        let deadline = tokio::time::Instant::now() + STATE_WAIT;
        loop {
            let body = self.get_json("/checkout").await;
            if done(&body) {
                return body;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "checkout never reached the expected state, last: {body}"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Post a payment widget result.
    pub async fn payment_callback(&self, body: &Value) -> Response {
        self.client
            .post(self.url("/payments/callback"))
            .json(body)
            .send()
            .await
            .expect("Failed to post payment callback")
    }

    async fn get_json(&self, path: &str) -> Value {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
        resp.json().await.expect("JSON body")
    }
}

impl Drop for TestStorefront {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// An order as the backend returns it.
#[must_use]
pub fn order_json(id: i64, payment_method: &str, payment_status: &str) -> Value {
    json!({
        "id": id,
        "orderNumber": format!("ORD{id}"),
        "restaurantId": 3,
        "restaurantName": "Spice Route",
        "orderItems": [
            {"menuItemId": 11, "menuItemName": "Masala Dosa", "quantity": 2, "unitPrice": 100.0, "totalPrice": 200.0}
        ],
        "subtotal": 200.0,
        "deliveryFee": 5.0,
        "tax": 20.0,
        "total": 225.0,
        "deliveryAddress": "12 Residency Road, Bengaluru",
        "deliveryPhone": "9876543210",
        "status": "PENDING",
        "paymentStatus": payment_status,
        "paymentMethod": payment_method
    })
}
