use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use actix_web::{http::StatusCode, test, web, App};
use alloy::signers::local::PrivateKeySigner;
use bytes::Bytes;

use gate_server::{
    routes, AppState, GeneratedResource, ResourceGenerator, ResourceKey, ServerConfig,
};
use stacks_gate::{
    sign_address_message, ClarityValue, GateConfig, GateError, LedgerClient, Network,
    NetworkConfig, ReadOnlyCall,
};

struct StubLedger {
    response: Result<ClarityValue, String>,
    calls: AtomicUsize,
}

impl StubLedger {
    fn returning(value: ClarityValue) -> Self {
        Self {
            response: Ok(value),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(msg: &str) -> Self {
        Self {
            response: Err(msg.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LedgerClient for StubLedger {
    async fn call_read_only(
        &self,
        _network: &NetworkConfig,
        _call: &ReadOnlyCall,
    ) -> Result<ClarityValue, GateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map_err(GateError::LedgerError)
    }
}

/// Generator double that records every key it is asked for.
struct StubGenerator {
    fail: bool,
    keys: Mutex<Vec<String>>,
}

impl StubGenerator {
    fn ok() -> Self {
        Self {
            fail: false,
            keys: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            keys: Mutex::new(Vec::new()),
        }
    }

    fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

impl ResourceGenerator for StubGenerator {
    async fn generate(&self, key: &ResourceKey) -> Result<GeneratedResource, GateError> {
        self.keys.lock().unwrap().push(key.to_string());
        if self.fail {
            return Err(GateError::GeneratorError("upstream returned 502".to_string()));
        }
        Ok(GeneratedResource {
            content_type: "image/svg+xml".to_string(),
            body: Bytes::from_static(b"<svg>face</svg>"),
        })
    }
}

type TestState = web::Data<AppState<StubLedger, StubGenerator>>;

fn state(ledger: StubLedger, generator: StubGenerator) -> TestState {
    web::Data::new(AppState::new(ServerConfig::default(), ledger, generator))
}

fn invoice_value() -> ClarityValue {
    ClarityValue::some(ClarityValue::tuple([
        ("amount", ClarityValue::uint(1000)),
        ("createdAt", ClarityValue::uint(148918)),
        ("resourceIndex", ClarityValue::uint(1)),
        ("resourceName", ClarityValue::string_utf8("bitcoin-face")),
        ("userIndex", ClarityValue::uint(1)),
    ]))
}

fn signed(network: Network) -> (String, String) {
    let signer = PrivateKeySigner::random();
    sign_address_message(&signer, &GateConfig::default(), network).unwrap()
}

fn resource_uri(address: &str, network: &str) -> String {
    format!("/resource?resource=bitcoin-face&address={address}&network={network}")
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .configure(routes::configure::<StubLedger, StubGenerator>),
        )
        .await
    };
}

#[actix_rt::test]
async fn test_unpaid_returns_402_with_payment_info() {
    let state = state(StubLedger::returning(ClarityValue::OptionalNone), StubGenerator::ok());
    let app = app!(state);
    let (address, sig) = signed(Network::Testnet);

    let req = test::TestRequest::get()
        .uri(&resource_uri(&address, "testnet"))
        .insert_header(("X-Signed-Message", sig))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["paid"], false);
    assert_eq!(body["status"], "No payment found for resource bitcoin-face");
    assert_eq!(body["paymentInfo"]["contractName"], "stacks-m2m-v2");
    assert_eq!(
        body["paymentInfo"]["contractAddress"],
        "ST1EGQ03EP0NE60FJV3X0MRE0QTJMRHF5X402W70M"
    );
    assert_eq!(
        body["paymentInfo"]["functionName"],
        "pay-invoice-by-resource-name"
    );
    assert_eq!(body["paymentInfo"]["functionArgs"][0], "u\"bitcoin-face\"");
    assert_eq!(
        body["paymentInfo"]["functionArgs"][1],
        format!("'{address}")
    );
    assert_eq!(state.ledger.calls(), 1);
    assert!(state.generator.keys().is_empty());
}

#[actix_rt::test]
async fn test_paid_returns_generated_resource() {
    let state = state(StubLedger::returning(invoice_value()), StubGenerator::ok());
    let app = app!(state);
    let (address, sig) = signed(Network::Testnet);

    let req = test::TestRequest::get()
        .uri(&resource_uri(&address, "testnet"))
        .insert_header(("X-Signed-Message", sig))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "image/svg+xml"
    );

    let body = test::read_body(resp).await;
    assert_eq!(body.as_ref(), b"<svg>face</svg>");
    assert_eq!(
        state.generator.keys(),
        vec!["ST1EGQ03EP0NE60FJV3X0MRE0QTJMRHF5X402W70M.stacks-m2m-v2.bitcoin-face.1.148918"]
    );
}

#[actix_rt::test]
async fn test_mainnet_grant_uses_mainnet_contract() {
    let state = state(StubLedger::returning(invoice_value()), StubGenerator::ok());
    let app = app!(state);
    let (address, sig) = signed(Network::Mainnet);

    let req = test::TestRequest::get()
        .uri(&resource_uri(&address, "mainnet"))
        .insert_header(("X-Signed-Message", sig))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        state.generator.keys(),
        vec!["SP1EGQ03EP0NE60FJV3X0MRE0QTJMRHF5X5EQY0QS.stacks-m2m-v2.bitcoin-face.1.148918"]
    );
}

#[actix_rt::test]
async fn test_unknown_network_rejected_without_ledger_call() {
    let state = state(StubLedger::returning(invoice_value()), StubGenerator::ok());
    let app = app!(state);
    let (address, sig) = signed(Network::Testnet);

    let req = test::TestRequest::get()
        .uri(&resource_uri(&address, "polkadot"))
        .insert_header(("X-Signed-Message", sig))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid network, must be mainnet or testnet");
    assert_eq!(state.ledger.calls(), 0);
}

#[actix_rt::test]
async fn test_missing_parameters_rejected() {
    let state = state(StubLedger::returning(invoice_value()), StubGenerator::ok());
    let app = app!(state);
    let (address, sig) = signed(Network::Testnet);

    let req = test::TestRequest::get()
        .uri(&format!("/resource?address={address}"))
        .insert_header(("X-Signed-Message", sig))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Missing required parameter: resource");

    let req = test::TestRequest::get()
        .uri(&resource_uri(&address, "testnet"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Missing required parameter: signedMessage");

    assert_eq!(state.ledger.calls(), 0);
}

#[actix_rt::test]
async fn test_signature_for_other_address_rejected() {
    let state = state(StubLedger::returning(invoice_value()), StubGenerator::ok());
    let app = app!(state);
    let (_, sig) = signed(Network::Testnet);
    let (other_address, _) = signed(Network::Testnet);

    let req = test::TestRequest::get()
        .uri(&resource_uri(&other_address, "testnet"))
        .insert_header(("X-Signed-Message", sig))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "address mismatch");
    assert_eq!(state.ledger.calls(), 0);
}

#[actix_rt::test]
async fn test_generator_failure_returns_500_text() {
    let state = state(StubLedger::returning(invoice_value()), StubGenerator::failing());
    let app = app!(state);
    let (address, sig) = signed(Network::Testnet);

    let req = test::TestRequest::get()
        .uri(&resource_uri(&address, "testnet"))
        .insert_header(("X-Signed-Message", sig))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = test::read_body(resp).await;
    assert_eq!(body.as_ref(), b"resource generation failed");
    assert_eq!(state.generator.keys().len(), 1);
}

#[actix_rt::test]
async fn test_undecodable_invoice_returns_500() {
    let state = state(StubLedger::returning(ClarityValue::uint(7)), StubGenerator::ok());
    let app = app!(state);
    let (address, sig) = signed(Network::Testnet);

    let req = test::TestRequest::get()
        .uri(&resource_uri(&address, "testnet"))
        .insert_header(("X-Signed-Message", sig))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "internal error");
    assert!(state.generator.keys().is_empty());
}

#[actix_rt::test]
async fn test_ledger_failure_returns_500() {
    let state = state(StubLedger::failing("connection refused"), StubGenerator::ok());
    let app = app!(state);
    let (address, sig) = signed(Network::Testnet);

    let req = test::TestRequest::get()
        .uri(&resource_uri(&address, "testnet"))
        .insert_header(("X-Signed-Message", sig))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "internal error");
}

#[actix_rt::test]
async fn test_health_and_index() {
    let state = state(StubLedger::returning(ClarityValue::OptionalNone), StubGenerator::ok());
    let app = app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_metrics_requires_token_when_configured() {
    let config = ServerConfig {
        metrics_token: Some("scrape-token".to_string()),
        ..ServerConfig::default()
    };
    let state = web::Data::new(AppState::new(
        config,
        StubLedger::returning(ClarityValue::OptionalNone),
        StubGenerator::ok(),
    ));
    let app = app!(state);

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer wrong"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer scrape-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_duplicated_query_parameter_gets_json_400() {
    let state = state(StubLedger::returning(invoice_value()), StubGenerator::ok());
    let app = app!(state);
    let (address, sig) = signed(Network::Testnet);

    let req = test::TestRequest::get()
        .uri(&format!("/resource?resource=a&resource=b&address={address}"))
        .insert_header(("X-Signed-Message", sig))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/json"
    );

    let body: serde_json::Value = test::read_body_json(resp).await;
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Invalid query"));
    assert!(error.contains("resource"));
    assert_eq!(state.ledger.calls(), 0);
}
