pub mod account;
pub mod trade;
