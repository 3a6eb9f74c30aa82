pub mod chart;
pub mod llm;
pub mod mail;
pub mod pdf;
pub mod places;
pub mod plan;
pub mod recommendation;
pub mod report;

#[cfg(test)]
pub mod testing;

pub use llm::LlmClient;
pub use mail::SmtpMailer;
pub use pdf::HttpPdfRenderer;
pub use places::PlacesClient;
pub use plan::{PlanError, PlanService, PlanSettings};
pub use recommendation::RecommendationService;
