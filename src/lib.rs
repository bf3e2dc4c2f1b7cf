pub mod app;
pub mod config;
pub mod db;
pub mod discounts;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod payments;
pub mod pricing;
pub mod purchase;
pub mod util;
