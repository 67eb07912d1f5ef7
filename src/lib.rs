//! Business manager for a school-uniform workshop: schools and their units,
//! per-unit production counts, revenue and cost figures, price quotes,
//! WhatsApp order reports and the reinvestment fund.

pub mod budget;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod financials;
pub mod fund;
pub mod inventory;
pub mod lenient;
pub mod model;
pub mod report;
pub mod service;
pub mod store;

#[cfg(feature = "desktop")]
mod commands;

#[cfg(feature = "desktop")]
pub use commands::run;

/// `RUST_LOG` wins; otherwise `info`. Safe to call more than once.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).try_init();
}
