pub mod characterize;
pub mod circuit;
pub mod config;
pub mod deps;
pub mod error;
pub mod export;
pub mod io;
pub mod post;
pub mod sweep;
pub mod units;
pub mod verification;

pub(crate) mod log;
