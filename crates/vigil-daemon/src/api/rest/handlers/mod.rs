//! API request handlers

mod analyze;
mod anomalies;
mod health;
mod metrics;
mod root;
mod scrape;

pub use analyze::*;
pub use anomalies::*;
pub use health::*;
pub use metrics::*;
pub use root::*;
pub use scrape::*;
