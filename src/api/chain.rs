use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::error_response;
use super::models::{
    AppState, ErrorResponse, FaultResponse, MineRequest, MineResponse, ValidateResponse,
};
use crate::blockchain::MineOptions;

/// Full ledger state: length, chain, mempool and difficulty.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.ledger.export_state())
}

/// Validate the whole chain; a broken link is reported, not raised.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let outcome = state.ledger.validate_chain();
    let resp = ValidateResponse {
        valid: outcome.is_ok(),
        length: state.ledger.len(),
        difficulty_prefix: state.ledger.difficulty_prefix().to_string(),
        fault: outcome.err().map(|fault| FaultResponse {
            index: fault.index,
            reason: fault.to_string(),
        }),
    };
    HttpResponse::Ok().json(resp)
}

/// Mine a block from the current mempool and wait for it.
/// The search runs on the miner pool; this worker only waits on a blocking thread.
#[post("/mine/")]
pub async fn mine_block(
    state: web::Data<AppState>,
    body: Option<web::Json<MineRequest>>,
) -> impl Responder {
    let req = body.map(web::Json::into_inner).unwrap_or_default();
    let job = state.miners.submit(MineOptions {
        miner: req.miner.trim().to_string(),
        notes: req.notes,
    });
    let job_id = job.id();

    match web::block(move || job.wait()).await {
        Ok(Ok(block)) => {
            info!("POST /mine/ - job {job_id} sealed block #{}", block.index());
            HttpResponse::Ok().json(MineResponse {
                message: "New block forged",
                block,
            })
        }
        Ok(Err(e)) => {
            warn!("POST /mine/ - job {job_id} failed: {e}");
            error_response(&e)
        }
        Err(e) => {
            warn!("POST /mine/ - job {job_id} could not be awaited: {e}");
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}
