pub mod config;
pub mod plan;

pub use config::{Config, FallbackPolicy, MailTls, ReportFormat};
pub use plan::*;
