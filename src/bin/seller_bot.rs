//! Long-polls the Telegram Bot API and answers seller commands.

use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use market_service::bot::CommandRouter;
use market_service::config::AppConfig;
use market_service::infrastructure::telegram::{IncomingMessage, TelegramBot};
use market_service::{account_links, create_pool, run_migrations, AccountLinks};

const POLL_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_DELAY: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

type Router = CommandRouter<
    market_service::infrastructure::account_repo::DieselAccountRepository,
    market_service::infrastructure::order_repo::DieselOrderRepository,
>;

async fn answer(bot: &TelegramBot, router: &Arc<Router>, message: IncomingMessage) {
    let Some(text) = message.text else {
        return;
    };
    let chat_id = message.chat.id;
    let telegram_id = message.from.as_ref().map_or(chat_id, |sender| sender.id);

    let router = Arc::clone(router);
    let reply = match tokio::task::spawn_blocking(move || router.handle(telegram_id, &text)).await {
        Ok(Some(reply)) => reply,
        Ok(None) => return,
        Err(e) => {
            log::error!("command handler for chat {} panicked: {}", chat_id, e);
            return;
        }
    };
    if let Err(e) = bot.send_text(chat_id, &reply).await {
        log::warn!("could not reply to chat {}: {}", chat_id, e);
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().expect("invalid configuration");
    let token = config.require_bot_token().expect("the seller bot needs a token");

    let pool = create_pool(&config.database_url, config.pool_size);
    run_migrations(&pool);

    let links: AccountLinks = account_links(&pool, &config.notify.bot_username);
    let router = Arc::new(CommandRouter::new(links));
    let bot = TelegramBot::new(token, config.notify.media_base_url.clone(), REQUEST_TIMEOUT)
        .expect("Failed to build the Telegram client");

    log::info!("seller bot @{} is polling for updates", config.notify.bot_username);

    let mut offset: Option<i64> = None;
    loop {
        let updates = match bot.get_updates(offset, POLL_TIMEOUT).await {
            Ok(updates) => updates,
            Err(e) => {
                log::warn!("getUpdates failed, retrying in {:?}: {}", RETRY_DELAY, e);
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };
        for update in updates {
            offset = Some(update.update_id + 1);
            if let Some(message) = update.message {
                answer(&bot, &router, message).await;
            }
        }
    }
}
