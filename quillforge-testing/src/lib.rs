//! ABOUTME: In-memory test doubles and fixture builders for the QuillForge workspace
//! ABOUTME: Dev-dependency only; nothing here is wired into the production server binary

pub mod fixtures;
pub mod mock_provider;
pub mod mock_repository;
pub mod mock_research;

pub use fixtures::{sample_job, sample_job_settings, sample_persona};
pub use mock_provider::MockProvider;
pub use mock_repository::MockRepository;
pub use mock_research::MockResearchSource;
