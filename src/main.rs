use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;
use std::io;
use std::sync::Arc;

use proof_ledger::api::{self, AppState};
use proof_ledger::archive::MemoryArchive;
use proof_ledger::blockchain::Ledger;
use proof_ledger::config::AppConfig;

fn to_io(err: proof_ledger::LedgerError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, err)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = AppConfig::from_env().map_err(to_io)?;
    let ledger = Arc::new(Ledger::new(config.ledger_config()).map_err(to_io)?);
    let state = web::Data::new(
        AppState::new(ledger, config.miner_threads, Arc::new(MemoryArchive::new()))
            .map_err(to_io)?,
    );

    info!(
        "Starting ledger API at http://{}:{} (difficulty prefix {:?}, {} miner threads)",
        config.host, config.port, config.difficulty_prefix, config.miner_threads
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
