use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_admin::api::router;
use course_admin::backend::HttpCourseBackend;
use course_admin::config::AppConfig;
use course_admin::services::CourseListController;
use course_admin::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::new_from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "course_admin=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("course backend at {}", config.api_base_url);
    let backend = Arc::new(HttpCourseBackend::new(config.api_base_url.clone())?);

    let courses = Arc::new(CourseListController::new(backend, config.feed_interval));
    courses.initialize();

    let state = AppState {
        courses: courses.clone(),
    };
    let app = router(state);

    info!("listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    courses.teardown();
    info!("shut down");

    Ok(())
}
