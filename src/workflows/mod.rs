pub mod extractor;
pub mod orchestrator;
pub mod progress;
pub mod resolver;
