//! ABOUTME: The five pipeline agents (Research, Writer, SEO, QA, Project Manager)
//! ABOUTME: and the process-wide registry the orchestrator looks them up through

pub mod project_manager;
pub mod qa;
pub mod registry;
pub mod research;
pub mod seo;
pub mod writer;

pub use project_manager::ProjectManagerAgent;
pub use qa::QaAgent;
pub use registry::AgentRegistry;
pub use research::ResearchAgent;
pub use seo::SeoAgent;
pub use writer::WriterAgent;
