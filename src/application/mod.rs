pub mod account_service;
pub mod cart_service;
pub mod notification;
pub mod order_service;
