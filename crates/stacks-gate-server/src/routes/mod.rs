use actix_web::web;
use stacks_gate::LedgerClient;

use crate::generator::ResourceGenerator;

pub mod health;
pub mod resource;

/// Mount every route for a given ledger and generator.
pub fn configure<L, G>(cfg: &mut web::ServiceConfig)
where
    L: LedgerClient + 'static,
    G: ResourceGenerator + 'static,
{
    health::configure::<L, G>(cfg);
    resource::configure::<L, G>(cfg);
}
