pub mod jobs;
pub mod stream;
