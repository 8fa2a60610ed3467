use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info};
use uuid::Uuid;

use super::models::{
    AppState, ErrorResponse, JobCreatedResponse, JobEntry, JobStatusResponse, MineRequest,
    prune_finished_jobs,
};
use crate::blockchain::MineOptions;
use crate::error::LedgerError;

fn parse_job_id(raw: &str) -> Result<Uuid, HttpResponse> {
    Uuid::parse_str(raw).map_err(|_| {
        HttpResponse::BadRequest().json(ErrorResponse {
            error: format!("invalid job id {raw:?}"),
        })
    })
}

fn unknown_job(id: Uuid) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: format!("no mining job {id}"),
    })
}

fn status_of(id: Uuid, entry: &JobEntry) -> JobStatusResponse {
    let (status, block, error) = match &entry.outcome {
        None => ("running", None, None),
        Some(Ok(block)) => ("done", Some(block.clone()), None),
        Some(Err(LedgerError::MiningCancelled)) => ("cancelled", None, None),
        Some(Err(e)) => ("failed", None, Some(e.to_string())),
    };
    JobStatusResponse {
        job_id: id.to_string(),
        status,
        block,
        error,
    }
}

/// Start a mining job in the background and return its id right away.
#[post("/mining/jobs/")]
pub async fn start_job(
    state: web::Data<AppState>,
    body: Option<web::Json<MineRequest>>,
) -> impl Responder {
    let req = body.map(web::Json::into_inner).unwrap_or_default();
    let job = state.miners.submit(MineOptions {
        miner: req.miner.trim().to_string(),
        notes: req.notes,
    });
    let id = job.id();

    let mut jobs = state.jobs.lock();
    jobs.insert(id, JobEntry::new(job));
    prune_finished_jobs(&mut jobs, state.finished_job_limit);
    drop(jobs);
    info!("JOBS - started mining job {id}");

    HttpResponse::Accepted().json(JobCreatedResponse {
        job_id: id.to_string(),
    })
}

/// Poll a job. A finished job is reported once and then forgotten.
#[get("/mining/jobs/{job_id}/")]
pub async fn job_status(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = match parse_job_id(&path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mut jobs = state.jobs.lock();
    let Some(entry) = jobs.get_mut(&id) else {
        return unknown_job(id);
    };
    let finished = entry.poll();
    let resp = status_of(id, entry);
    if finished {
        jobs.remove(&id);
        debug!("JOBS - job {id} reported as {} and released", resp.status);
    }

    HttpResponse::Ok().json(resp)
}

/// Raise the job's cancel flag. The search notices it within a few thousand attempts.
#[post("/mining/jobs/{job_id}/cancel/")]
pub async fn cancel_job(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = match parse_job_id(&path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mut jobs = state.jobs.lock();
    let Some(entry) = jobs.get_mut(&id) else {
        return unknown_job(id);
    };
    if entry.poll() {
        debug!("JOBS - job {id} already finished, cancel has no effect");
    } else {
        entry.job.cancel();
        info!("JOBS - cancel requested for job {id}");
    }

    HttpResponse::Accepted().json(status_of(id, entry))
}
