pub mod account_service;
pub mod trade_service;
