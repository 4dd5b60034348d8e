//! Seller-facing chat commands.
//!
//! [`CommandRouter::handle`] is synchronous and talks to the database, so the
//! polling loop runs it on the blocking pool.

use crate::application::account_service::AccountLinkService;
use crate::domain::errors::DomainError;
use crate::domain::order::OrderStatus;
use crate::domain::ports::{AccountRepository, OrderRepository};

const NOT_LINKED: &str =
    "🚫 Account not linked.\nPlease log in to the website and click 'Connect Telegram'.";
const STATUS_USAGE: &str = "Usage: /status <order_id> <PENDING|PAID|SHIPPED|DELIVERED|CANCELLED>";
const DELETE_USAGE: &str = "Usage: /delete_product <product_id>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start(Option<String>),
    Help,
    SetStatus { order_id: i64, status: OrderStatus },
    DeleteProduct(i64),
    Unlink,
    /// A known command with arguments that don't parse.
    Usage(&'static str),
    Unknown(String),
}

impl BotCommand {
    /// `None` for plain text. `/cmd@some_bot` is treated as `/cmd`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let mut parts = rest.split_whitespace();
        let head = parts.next()?;
        let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();

        let command = match name.as_str() {
            "start" => BotCommand::Start(args.first().map(|t| t.to_string())),
            "help" => BotCommand::Help,
            "unlink" => BotCommand::Unlink,
            "status" => match args.as_slice() {
                [id, status] => match (id.parse::<i64>(), status.parse::<OrderStatus>()) {
                    (Ok(order_id), Ok(status)) => BotCommand::SetStatus { order_id, status },
                    _ => BotCommand::Usage(STATUS_USAGE),
                },
                _ => BotCommand::Usage(STATUS_USAGE),
            },
            "delete_product" => match args.as_slice() {
                [id] => id
                    .parse()
                    .map(BotCommand::DeleteProduct)
                    .unwrap_or(BotCommand::Usage(DELETE_USAGE)),
                _ => BotCommand::Usage(DELETE_USAGE),
            },
            other => BotCommand::Unknown(other.to_string()),
        };
        Some(command)
    }
}

pub struct CommandRouter<A, O> {
    links: AccountLinkService<A, O>,
}

impl<A: AccountRepository, O: OrderRepository> CommandRouter<A, O> {
    pub fn new(links: AccountLinkService<A, O>) -> Self {
        Self { links }
    }

    /// Reply text for one incoming message, or `None` when it needs no reply.
    pub fn handle(&self, telegram_id: i64, text: &str) -> Option<String> {
        let command = BotCommand::parse(text)?;
        let reply = match self.dispatch(telegram_id, command) {
            Ok(reply) => reply,
            Err(e) => failure_reply(e),
        };
        Some(reply)
    }

    fn dispatch(&self, telegram_id: i64, command: BotCommand) -> Result<String, DomainError> {
        match command {
            BotCommand::Start(Some(token)) => match self.links.redeem_token(&token, telegram_id) {
                Ok(user) => Ok(format!(
                    "🌟 Hello {}!\nYour Telegram has been linked successfully. \
                     You will get a message here whenever someone orders from your shop.",
                    user.first_name
                )),
                Err(DomainError::InvalidToken) => Ok("❌ Invalid or expired link.".to_string()),
                Err(e) => Err(e),
            },
            BotCommand::Start(None) => Ok(match self.links.resolve(telegram_id)? {
                Some(user) => format!(
                    "👋 Welcome back, {}!\nYou are already linked. Send /help to see what I can do.",
                    user.first_name
                ),
                None => NOT_LINKED.to_string(),
            }),
            BotCommand::Help => Ok(match self.links.resolve(telegram_id)? {
                Some(_) => "Here are the commands you can use with this bot:\n\
                            /status <order_id> <status> - Update the status of an order.\n\
                            /delete_product <product_id> - Delete a product from your shop.\n\
                            /unlink - Disconnect this Telegram account."
                    .to_string(),
                None => "Hello there!👋 I'm a bot that helps you manage your online shop. \
                         To get started, please log in to the website and click 'Connect Telegram'."
                    .to_string(),
            }),
            BotCommand::SetStatus { order_id, status } => {
                if self.links.resolve(telegram_id)?.is_none() {
                    return Ok(NOT_LINKED.to_string());
                }
                let change = self.links.set_order_status(order_id, status, telegram_id)?;
                Ok(format!("✅ Order {} is now {}.", change.order_id, change.to))
            }
            BotCommand::DeleteProduct(product_id) => {
                if self.links.resolve(telegram_id)?.is_none() {
                    return Ok(NOT_LINKED.to_string());
                }
                let deleted = self.links.delete_product(product_id, telegram_id)?;
                Ok(format!("🗑️ Product \"{}\" has been deleted.", deleted.title))
            }
            BotCommand::Unlink => Ok(if self.links.unlink(telegram_id)? {
                "🔌 Your Telegram account has been unlinked.".to_string()
            } else {
                "This Telegram account is not linked.".to_string()
            }),
            BotCommand::Usage(usage) => Ok(usage.to_string()),
            BotCommand::Unknown(name) => Ok(format!(
                "Unknown command /{}. Send /help for the list of commands.",
                name
            )),
        }
    }
}

fn failure_reply(e: DomainError) -> String {
    match e {
        DomainError::NotFound => "❓ Not found.".to_string(),
        DomainError::PermissionDenied => "🚫 That doesn't belong to your shop.".to_string(),
        DomainError::InvalidStatusTransition { from, to } => {
            format!("⚠️ An order that is {} cannot be moved to {}.", from, to)
        }
        other => {
            log::error!("bot command failed: {}", other);
            "Something went wrong, please try again later.".to_string()
        }
    }
}
