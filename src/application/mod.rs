pub mod change_correlation;
pub mod investigation;

pub use change_correlation::ChangeCorrelationService;
pub use investigation::InvestigationOrchestrator;
