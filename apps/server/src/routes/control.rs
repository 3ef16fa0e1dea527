use actix_web::{HttpResponse, get, post, web};
use pulse_worker::SchedulerHandle;
use serde_json::json;
use tracing::info;

use crate::error::AppError;

/// Run a check cycle now and wait for it to finish
#[post("/trigger-check")]
pub async fn trigger_check_route(
    scheduler: web::Data<SchedulerHandle>,
) -> Result<HttpResponse, AppError> {
    info!("Manual health check triggered via API");
    let stats = scheduler.trigger().await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Health check triggered successfully",
        "stats": stats,
    })))
}

#[get("/stats")]
pub async fn stats_route(scheduler: web::Data<SchedulerHandle>) -> HttpResponse {
    HttpResponse::Ok().json(scheduler.stats().await)
}
