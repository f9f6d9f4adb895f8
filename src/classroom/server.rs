// HTTP service: the opinion votes and read-only views of the datasets.

use actix_web::http::StatusCode;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer};
use log::error;

use crate::classroom::config_reader::DatasetKind;
use crate::classroom::io_csv::Datasets;
use crate::classroom::opinions::{OpinionLedger, OpinionSubmission};
use crate::classroom::*;

/// Read-only state shared by all the workers.
pub struct AppState {
    pub datasets: Datasets,
    pub model: ScoreModel,
}

fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "error": message }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check)).service(
        web::scope("/api")
            .route("/opinions", web::get().to(list_opinions))
            .route("/opinions", web::post().to(submit_opinion))
            .route("/rankings", web::get().to(get_rankings))
            .route("/datasets/{kind}", web::get().to(get_dataset)),
    );
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn list_opinions(ledger: web::Data<OpinionLedger>) -> HttpResponse {
    let ledger = ledger.into_inner();
    match web::block(move || ledger.read_all()).await {
        Ok(Ok(records)) => HttpResponse::Ok().json(records),
        Ok(Err(e)) => {
            error!("list_opinions: {}: {:?}", e, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read opinions")
        }
        Err(e) => {
            error!("list_opinions: {:?}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read opinions")
        }
    }
}

// The body is decoded by hand so that a malformed body gets the same answer as
// a missing field.
async fn submit_opinion(ledger: web::Data<OpinionLedger>, body: web::Bytes) -> HttpResponse {
    let submission: OpinionSubmission = match serde_json::from_slice(&body) {
        Ok(s) => s,
        Err(e) => {
            debug!("submit_opinion: unreadable body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Missing fields");
        }
    };
    let ledger = ledger.into_inner();
    match web::block(move || ledger.append(&submission)).await {
        Ok(Ok(record)) => {
            info!("submit_opinion: stored {}", record.id);
            HttpResponse::Ok().json(record)
        }
        Ok(Err(e)) if e.is_validation() => {
            debug!("submit_opinion: {}", e);
            error_response(StatusCode::BAD_REQUEST, "Missing fields")
        }
        Ok(Err(e)) => {
            error!("submit_opinion: {}: {:?}", e, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save opinion")
        }
        Err(e) => {
            error!("submit_opinion: {:?}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save opinion")
        }
    }
}

async fn get_rankings(state: web::Data<AppState>) -> HttpResponse {
    match state.datasets.ranking(&state.model) {
        Some(ranking) => HttpResponse::Ok().json(ranking),
        None => error_response(StatusCode::NOT_FOUND, "No country summary loaded"),
    }
}

async fn get_dataset(state: web::Data<AppState>, kind: web::Path<String>) -> HttpResponse {
    let kind_name = kind.into_inner();
    let kind = match DatasetKind::from_name(&kind_name) {
        Some(k) => k,
        None => return error_response(StatusCode::NOT_FOUND, "Unknown dataset"),
    };
    match state.datasets.to_json(kind) {
        Ok(Some(js)) => HttpResponse::Ok().json(js),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Dataset not loaded"),
        Err(e) => {
            error!("get_dataset: {}: {:?}", kind_name, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read dataset")
        }
    }
}

/// Runs the server until it is stopped.
pub async fn serve(
    host: String,
    port: u16,
    state: AppState,
    ledger: OpinionLedger,
) -> ClassroomResult<()> {
    let address = format!("{}:{}", host, port);
    info!(
        "serve: listening on {}, ledger at {:?}",
        address,
        ledger.path()
    );
    let state = web::Data::new(state);
    let ledger = web::Data::new(ledger);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(ledger.clone())
            .wrap(Logger::default())
            .configure(configure_routes)
    })
    .bind(&address)
    .context(ServerSnafu { address: &address })?
    .run()
    .await
    .context(ServerSnafu { address: &address })
}
