use std::sync::Arc;

use dotenvy::dotenv;
use market_service::application::notification::{
    spawn_worker, NotificationDispatcher, WorkerOptions,
};
use market_service::config::AppConfig;
use market_service::domain::ports::Messenger;
use market_service::infrastructure::notification_repo::DieselNotificationRepository;
use market_service::infrastructure::telegram::{LogOnlyMessenger, TelegramBot};
use market_service::{build_server, create_pool, run_migrations, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().expect("invalid configuration");

    let pool = create_pool(&config.database_url, config.pool_size);
    run_migrations(&pool);

    let notify = &config.notify;
    let messenger: Arc<dyn Messenger> = match &notify.bot_token {
        Some(token) => Arc::new(
            TelegramBot::new(token, notify.media_base_url.clone(), notify.send_timeout)
                .expect("Failed to build the Telegram client"),
        ),
        None => {
            log::warn!("BOT_TOKEN is not set; seller notifications will only be logged");
            Arc::new(LogOnlyMessenger)
        }
    };
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::new(DieselNotificationRepository::new(pool.clone())),
        messenger,
        notify.send_timeout,
    ));
    let (notifier, _worker) = spawn_worker(
        dispatcher,
        WorkerOptions {
            queue_capacity: notify.queue_capacity,
            concurrency: notify.concurrency,
        },
    );

    let state = AppState::new(&pool, Arc::new(notifier), &notify.bot_username);

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(state, &config.host, config.port)?.await
}
