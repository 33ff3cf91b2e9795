use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio::{signal, sync::mpsc, sync::watch};
use tracing::{error, info};

use travelops_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Shared queue, storage and audit logger
    let audit_logger = api::logging::setup_logger(api::logging::LoggerConfig::default());
    let message_queue: Arc<dyn api::message_queue::MessageQueue> = Arc::new(
        api::message_queue::InMemoryMessageQueue::with_max_size(cfg.job_queue_capacity),
    );
    let storage: Arc<dyn api::storage::FileStorage> =
        Arc::new(api::storage::LocalFileStorage::new(cfg.storage_root()));

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let routing = api::events::JobRouting {
        ops_mailbox: cfg.ops_mailbox.clone(),
        max_retries: cfg.job_max_retries,
    };
    let events_handle = tokio::spawn(api::events::process_events(
        event_rx,
        message_queue.clone(),
        routing,
    ));

    // Services are shared with whichever transport embeds this worker
    let ctx = api::commands::CommandContext {
        db_pool: db_arc.clone(),
        event_sender: Arc::new(api::events::EventSender::new(event_tx)),
        storage: storage.clone(),
        settings: api::commands::BookingSettings::from(&cfg),
    };
    let bookings =
        api::services::bookings::BookingService::new(ctx.clone(), audit_logger.clone());
    let amendments =
        api::services::amendments::AmendmentService::new(ctx, audit_logger.clone());
    let page = bookings
        .list_bookings(1, 1)
        .await
        .context("failed to read bookings")?;
    info!(bookings = page.total, "Booking store ready");

    // Notification worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = api::notifications::NotificationWorker::new(
        message_queue,
        Arc::new(api::notifications::LogMailer),
        storage,
        db_arc.clone(),
        audit_logger,
    )
    .with_poll_interval(Duration::from_millis(cfg.worker_poll_interval_ms));
    let worker_handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    info!(environment = %cfg.environment, "travelops-worker running");
    shutdown_signal().await;
    info!("Shutdown requested");

    // Dropping the services closes the event channel and ends the event loop.
    drop(bookings);
    drop(amendments);
    if shutdown_tx.send(true).is_err() {
        error!("Notification worker exited before shutdown");
    }
    if let Err(e) = worker_handle.await {
        error!("Notification worker task failed: {}", e);
    }
    if let Err(e) = events_handle.await {
        error!("Event processor task failed: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
