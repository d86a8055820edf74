use std::time::Instant;

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use stacks_gate::{decide, AccessDecision, AccessRequest, LedgerClient, SIGNED_MESSAGE_HEADER};

use crate::error::ServerError;
use crate::generator::{ResourceGenerator, ResourceKey};
use crate::metrics::{DECISIONS_TOTAL, GENERATOR_FETCHES, GENERATOR_LATENCY};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ResourceQuery {
    pub resource: Option<String>,
    pub address: Option<String>,
    pub network: Option<String>,
}

/// GET /resource - Paid resource behind signature and invoice checks
pub async fn gated_resource<L, G>(
    req: HttpRequest,
    query: web::Query<ResourceQuery>,
    state: web::Data<AppState<L, G>>,
) -> Result<HttpResponse, ServerError>
where
    L: LedgerClient + 'static,
    G: ResourceGenerator + 'static,
{
    let query = query.into_inner();
    let signed_message = req
        .headers()
        .get(SIGNED_MESSAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let request = AccessRequest {
        resource: query.resource,
        address: query.address,
        network: query.network,
        signed_message,
    };

    let gate = &state.config.gate;
    let decision = match decide(gate, &state.ledger, &request).await {
        Ok(decision) => decision,
        Err(e) => {
            DECISIONS_TOTAL.with_label_values(&["error"]).inc();
            return Err(e.into());
        }
    };
    DECISIONS_TOTAL.with_label_values(&[decision.outcome()]).inc();

    match &decision {
        AccessDecision::BadRequest(reason) => Err(ServerError::BadRequest(reason.clone())),
        AccessDecision::PaymentRequired { .. } => {
            Ok(HttpResponse::PaymentRequired().json(decision.payment_data()))
        }
        AccessDecision::Granted {
            invoice, network, ..
        } => {
            let key = ResourceKey::for_invoice(&gate.network(*network).contract, invoice);

            let started = Instant::now();
            let generated = state.generator.generate(&key).await;
            GENERATOR_LATENCY.observe(started.elapsed().as_secs_f64());

            match generated {
                Ok(resource) => {
                    GENERATOR_FETCHES.with_label_values(&["ok"]).inc();
                    Ok(HttpResponse::Ok()
                        .content_type(resource.content_type)
                        .body(resource.body))
                }
                Err(e) => {
                    GENERATOR_FETCHES.with_label_values(&["error"]).inc();
                    Err(ServerError::Generation(format!("{key}: {e}")))
                }
            }
        }
    }
}

pub fn configure<L, G>(cfg: &mut web::ServiceConfig)
where
    L: LedgerClient + 'static,
    G: ResourceGenerator + 'static,
{
    // Malformed query strings answer like any other bad parameter
    let query_config = web::QueryConfig::default()
        .error_handler(|e, _req| ServerError::BadRequest(format!("Invalid query: {e}")).into());

    cfg.service(
        web::resource("/resource")
            .app_data(query_config)
            .route(web::get().to(gated_resource::<L, G>)),
    );
}
