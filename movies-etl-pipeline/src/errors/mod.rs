mod extractor;
mod loader;
mod orchestrator;

pub use extractor::ExtractorError;
pub use loader::LoaderError;
pub use orchestrator::OrchestratorError;
