use actix_web::{HttpResponse, Responder, get, web};
use pulse_worker::SchedulerHandle;
use serde_json::json;

/// Service banner
#[get("/")]
pub async fn root_route() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "service": "Health Monitor Worker",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness plus scheduler state
#[get("/health")]
pub async fn health_route(scheduler: web::Data<SchedulerHandle>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "scheduler_running": scheduler.is_running(),
        "check_interval": scheduler.interval().as_secs(),
    }))
}
