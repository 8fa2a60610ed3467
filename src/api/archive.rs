use actix_web::{HttpResponse, Responder, get, post, web};
use log::warn;

use super::error_response;
use super::models::{AppState, ArchiveRequest, ArchiveResponse};
use crate::archive::{ContentId, archive_ledger, load_snapshot};

/// Snapshot the ledger into the archive store.
#[post("/archive/")]
pub async fn post_archive(
    state: web::Data<AppState>,
    body: Option<web::Json<ArchiveRequest>>,
) -> impl Responder {
    let name = body
        .and_then(|b| b.into_inner().name)
        .unwrap_or_else(|| format!("ledger-{}", state.ledger.len()));

    match archive_ledger(&state.ledger, state.archive.as_ref(), &name) {
        Ok(cid) => HttpResponse::Created().json(ArchiveResponse {
            cid: cid.to_string(),
        }),
        Err(e) => {
            warn!("POST /archive/ - {e}");
            error_response(&e)
        }
    }
}

/// Fetch an archived snapshot by content id.
#[get("/archive/{cid}/")]
pub async fn get_archive(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let cid = ContentId::new(path.into_inner());
    match load_snapshot(state.archive.as_ref(), &cid) {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(e) => {
            warn!("GET /archive/{cid}/ - {e}");
            error_response(&e)
        }
    }
}
