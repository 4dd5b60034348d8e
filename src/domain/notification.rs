use std::collections::BTreeMap;
use std::fmt::Write as _;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use super::pricing;

/// Everything needed to tell sellers about one order.
#[derive(Debug, Clone)]
pub struct OrderNotice {
    pub order_id: i64,
    pub buyer_name: String,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<NoticeLine>,
}

#[derive(Debug, Clone)]
pub struct NoticeLine {
    pub seller_id: i64,
    pub seller_chat_id: Option<i64>,
    pub title: String,
    pub quantity: i32,
    pub price_at_purchase: BigDecimal,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub image: Option<String>,
}

impl OrderNotice {
    /// One message per seller with a linked chat, ordered by seller id.
    pub fn seller_messages(&self) -> Vec<OutboundMessage> {
        let mut by_seller: BTreeMap<i64, Vec<&NoticeLine>> = BTreeMap::new();
        for line in &self.lines {
            by_seller.entry(line.seller_id).or_default().push(line);
        }

        by_seller
            .into_values()
            .filter_map(|lines| {
                let chat_id = lines.iter().find_map(|l| l.seller_chat_id)?;
                Some(OutboundMessage {
                    chat_id,
                    text: self.compose(&lines),
                    image: lines.iter().find_map(|l| l.image.clone()),
                })
            })
            .collect()
    }

    fn compose(&self, lines: &[&NoticeLine]) -> String {
        let totals: Vec<BigDecimal> = lines
            .iter()
            .map(|l| pricing::line_total(&l.price_at_purchase, l.quantity))
            .collect();
        let earnings = pricing::sum_totals(&totals);

        let mut text = String::from("🎉 New Order Received! 🎉\n\n");
        let _ = writeln!(text, "Order ID: {}", self.order_id);
        text.push_str("Products:\n");
        for line in lines {
            let _ = writeln!(text, "  • {} × {}", line.title, line.quantity);
        }
        let _ = writeln!(text, "Customer: {}", self.buyer_name);
        let _ = writeln!(text, "Your Earnings: ${}", earnings);
        let _ = writeln!(
            text,
            "\nOrder Date: {}",
            self.created_at.format("%Y-%m-%d %H:%M")
        );
        text.push_str("View details on your dashboard.");
        text
    }
}
