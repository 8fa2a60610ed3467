use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AttackQuery, AttackResponse, ErrorResponse};
use crate::attack::{monte_carlo_success, nakamoto_success_probability};

const MAX_RUNS: u32 = 1_000_000;

#[get("/attack/")]
pub async fn get_attack_probability(query: web::Query<AttackQuery>) -> impl Responder {
    let q = query.into_inner();
    if !(0.0..=100.0).contains(&q.attacker_power) {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "attacker_power must be within 0..=100".into(),
        });
    }

    let monte_carlo = q.runs.map(|runs| {
        monte_carlo_success(
            q.attacker_power,
            q.confirmations,
            runs.min(MAX_RUNS),
            &mut rand::thread_rng(),
        )
    });

    HttpResponse::Ok().json(AttackResponse {
        attacker_power: q.attacker_power,
        confirmations: q.confirmations,
        probability: nakamoto_success_probability(q.attacker_power, q.confirmations),
        monte_carlo,
    })
}
