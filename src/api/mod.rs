mod archive;
mod attack;
mod chain;
mod health;
mod mining;
pub mod models;
mod tx;

use actix_web::HttpResponse;
use actix_web::web::{self, ServiceConfig};

use crate::error::LedgerError;
use models::ErrorResponse;

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::validate_chain)
            .service(chain::mine_block)
            .service(mining::start_job)
            .service(mining::job_status)
            .service(mining::cancel_job)
            .service(tx::post_transaction)
            .service(tx::get_mempool)
            .service(archive::post_archive)
            .service(archive::get_archive)
            .service(attack::get_attack_probability),
    );
}

/// Map a ledger error onto a JSON error response.
pub(crate) fn error_response(err: &LedgerError) -> HttpResponse {
    let body = ErrorResponse {
        error: err.to_string(),
    };
    match err {
        LedgerError::InvalidAmount(_)
        | LedgerError::InvalidRating(_)
        | LedgerError::InvalidDifficulty(_)
        | LedgerError::DuplicateId(_)
        | LedgerError::Serialization(_) => HttpResponse::BadRequest().json(body),
        LedgerError::MiningCancelled => HttpResponse::Conflict().json(body),
        LedgerError::IterationLimit(_) | LedgerError::MinerUnavailable(_) => {
            HttpResponse::ServiceUnavailable().json(body)
        }
        LedgerError::InvalidChain(_) => HttpResponse::UnprocessableEntity().json(body),
        LedgerError::UnknownContent(_) => HttpResponse::NotFound().json(body),
        LedgerError::Archive(_) => HttpResponse::BadGateway().json(body),
        LedgerError::Config(_) => HttpResponse::InternalServerError().json(body),
    }
}
