// HTTP surface: one module per route group

pub mod plaid;
