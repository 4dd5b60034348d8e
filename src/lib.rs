pub mod application;
pub mod bot;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::account_service::AccountLinkService;
use application::cart_service::CartService;
use application::order_service::OrderService;
use domain::ports::OrderNotifier;
use infrastructure::account_repo::DieselAccountRepository;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::order_repo::DieselOrderRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type Orders = OrderService<DieselOrderRepository, Arc<dyn OrderNotifier>>;
pub type Carts = CartService<DieselCartRepository>;
pub type AccountLinks = AccountLinkService<DieselAccountRepository, DieselOrderRepository>;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

pub fn account_links(pool: &DbPool, bot_username: &str) -> AccountLinks {
    AccountLinkService::new(
        DieselAccountRepository::new(pool.clone()),
        DieselOrderRepository::new(pool.clone()),
        bot_username,
    )
}

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<Orders>,
    pub carts: Arc<Carts>,
    pub accounts: Arc<AccountLinks>,
}

impl AppState {
    pub fn new(pool: &DbPool, notifier: Arc<dyn OrderNotifier>, bot_username: &str) -> Self {
        Self {
            orders: Arc::new(OrderService::new(
                DieselOrderRepository::new(pool.clone()),
                notifier,
            )),
            carts: Arc::new(CartService::new(DieselCartRepository::new(pool.clone()))),
            accounts: Arc::new(account_links(pool, bot_username)),
        }
    }
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = handlers::ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::create_order))
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route("/{id}/status", web::put().to(handlers::orders::update_status)),
            )
            .service(
                web::scope("/cart")
                    .route("", web::get().to(handlers::cart::list_cart))
                    .route("", web::post().to(handlers::cart::add_to_cart))
                    .route("/{id}", web::put().to(handlers::cart::update_cart_item))
                    .route("/{id}", web::delete().to(handlers::cart::remove_cart_item)),
            )
            .route(
                "/account/telegram-link",
                web::get().to(handlers::account::telegram_link),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
