use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, HealthResponse};

#[get("/health/")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        length: state.ledger.len(),
    })
}
