use actix_web::web;

mod control;
mod health;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health::root_route)
        .service(health::health_route)
        .service(control::trigger_check_route)
        .service(control::stats_route);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use pulse_worker::{Config, Orchestrator, SchedulerHandle};
    use serde_json::Value;

    async fn scheduler() -> (web::Data<SchedulerHandle>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.registry.url = dir.path().join("registry.db").to_string_lossy().into_owned();

        let handle = Orchestrator::new(config).await.unwrap().start().await;
        (web::Data::new(handle), dir)
    }

    #[actix_web::test]
    async fn test_root_and_health() {
        let (scheduler, _dir) = scheduler().await;
        let app = test::init_service(App::new().app_data(scheduler.clone()).configure(routes)).await;

        let root: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(root["status"], "running");

        let health: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["scheduler_running"], true);
        assert_eq!(health["check_interval"], 30);

        scheduler.stop().await.unwrap();
    }

    #[actix_web::test]
    async fn test_stats() {
        let (scheduler, _dir) = scheduler().await;
        let app = test::init_service(App::new().app_data(scheduler.clone()).configure(routes)).await;

        let stats: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/stats").to_request()).await;
        assert_eq!(stats["active_monitors"], 0);
        assert_eq!(stats["check_interval"], 30);
        assert_eq!(stats["max_workers"], 10);
        assert_eq!(stats["scheduler_running"], true);

        scheduler.stop().await.unwrap();
    }

    #[actix_web::test]
    async fn test_trigger_check() {
        let (scheduler, _dir) = scheduler().await;
        let app = test::init_service(App::new().app_data(scheduler.clone()).configure(routes)).await;

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post().uri("/trigger-check").to_request(),
        )
        .await;
        assert_eq!(body["success"], true);
        assert_eq!(body["stats"]["attempted"], 0);

        scheduler.stop().await.unwrap();

        let response =
            test::call_service(&app, test::TestRequest::post().uri("/trigger-check").to_request()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
