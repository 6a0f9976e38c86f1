//! ABOUTME: Research Data Source implementation (§4.2)
//! ABOUTME: Implements the `ResearchSource` trait seam declared in `quillforge-core`

pub mod http_source;

pub use http_source::HttpResearchSource;
