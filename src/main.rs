use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use std::sync::Arc;

use gym_attendance::attendance::{AttendanceService, AttendanceStore, ReconciliationJobs};
use gym_attendance::auth::otp::OtpStore;
use gym_attendance::clock::{Clock, SystemClock};
use gym_attendance::config::Config;
use gym_attendance::db::{MySqlStore, init_db, seed_default_shifts};
use gym_attendance::docs::ApiDoc;
use gym_attendance::notify::{LogNotifier, Notifier};
use gym_attendance::routes;
use gym_attendance::utils::{email_cache, email_filter};
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi; // for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Gym attendance service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(
        civil_offset = %config.civil_offset(),
        "Server starting..."
    );

    let pool = init_db(&config.database_url).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.civil_offset()));
    let store: Arc<dyn AttendanceStore> =
        Arc::new(MySqlStore::new(pool.clone(), config.civil_offset()));

    if seed_default_shifts(store.as_ref()).await? {
        info!("Default shifts seeded");
    }

    let service = AttendanceService::new(Arc::clone(&store), Arc::clone(&clock));
    let otp_store = OtpStore::new(Arc::clone(&clock), config.otp_ttl());
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let jobs = Arc::new(ReconciliationJobs::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        config.default_timeout_grace(),
    ));
    jobs.spawn(config.reconcile_interval());

    let pool_for_filter_warmup = pool.clone();
    let pool_for_cache_warmup = pool.clone();

    actix_web::rt::spawn(async move {
        if let Err(e) = email_filter::warmup_email_filter(&pool_for_filter_warmup, 100).await {
            error!(error = %e, "Failed to warm up email filter");
        }
    });

    actix_web::rt::spawn(async move {
        // last 30 days of active users, 250 per batch
        if let Err(e) = email_cache::warmup_email_cache(&pool_for_cache_warmup, 30, 250).await {
            error!(error = %e, "Failed to warm up email cache");
        }
    });

    let server_addr = config.server_addr.clone();
    let route_config = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard so the UI's JS/CSS assets resolve
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(service.clone()))
            .app_data(Data::new(otp_store.clone()))
            .app_data(Data::from(Arc::clone(&notifier)))
            .service(index)
            .configure(|cfg| routes::configure(cfg, route_config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
