use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, warn};

use super::error_response;
use super::models::{AppState, MempoolResponse, NewTxRequest, NewTxResponse};
use crate::transaction::{DEFAULT_STATUS, TxOptions, parse_amount};

/// Submit a new transaction into the mempool. No balance checks: only the amount
/// (and rating) must be numeric.
#[post("/tx/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> impl Responder {
    let req = body.into_inner();
    debug!(
        "POST /tx/ - received: {} -> {} amount={}",
        req.sender, req.recipient, req.amount
    );

    let amount = match parse_amount(&req.amount) {
        Ok(a) => a,
        Err(e) => {
            warn!("POST /tx/ - rejected: {e}");
            return error_response(&e);
        }
    };
    let opts = TxOptions {
        id: req.id,
        rating: req.rating.unwrap_or(0.0),
        description: req.description.unwrap_or_default(),
        status: req.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        category: req.category.unwrap_or_default(),
    };

    match state
        .ledger
        .submit_transaction(req.sender, req.recipient, amount, opts)
    {
        Ok(index) => HttpResponse::Created().json(NewTxResponse {
            message: format!("Transaction will be added to Block {index}"),
            index,
        }),
        Err(e) => {
            warn!("POST /tx/ - rejected: {e}");
            error_response(&e)
        }
    }
}

/// Pending transactions, oldest first.
#[get("/mempool/")]
pub async fn get_mempool(state: web::Data<AppState>) -> impl Responder {
    let transactions = state.ledger.pending_transactions();
    HttpResponse::Ok().json(MempoolResponse {
        size: transactions.len(),
        transactions,
    })
}
