//! ABOUTME: Row <-> domain-type conversions for the enums stored as TEXT columns

use quillforge_core::agent_type::AgentType;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::job::JobStatus;
use quillforge_core::step::StepStatus;
use quillforge_core::traits::repository::LogLevel;

pub fn job_status_to_text(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Processing => "processing",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
    }
}

pub fn job_status_from_text(s: &str) -> Result<JobStatus> {
    match s {
        "pending" => Ok(JobStatus::Pending),
        "processing" => Ok(JobStatus::Processing),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        "cancelled" => Ok(JobStatus::Cancelled),
        other => Err(PipelineError::internal(format!("unknown job status in row: {other}"))),
    }
}

pub fn agent_type_to_text(agent_type: AgentType) -> &'static str {
    agent_type.as_str()
}

pub fn agent_type_from_text(s: &str) -> Result<AgentType> {
    match s {
        "research" => Ok(AgentType::Research),
        "writer" => Ok(AgentType::Writer),
        "seo" => Ok(AgentType::Seo),
        "qa" => Ok(AgentType::Qa),
        "project_manager" => Ok(AgentType::ProjectManager),
        other => Err(PipelineError::internal(format!("unknown agent type in row: {other}"))),
    }
}

pub fn step_status_to_text(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "pending",
        StepStatus::Running => "running",
        StepStatus::Completed => "completed",
        StepStatus::Failed => "failed",
        StepStatus::Skipped => "skipped",
    }
}

pub fn step_status_from_text(s: &str) -> Result<StepStatus> {
    match s {
        "pending" => Ok(StepStatus::Pending),
        "running" => Ok(StepStatus::Running),
        "completed" => Ok(StepStatus::Completed),
        "failed" => Ok(StepStatus::Failed),
        "skipped" => Ok(StepStatus::Skipped),
        other => Err(PipelineError::internal(format!("unknown step status in row: {other}"))),
    }
}

pub fn log_level_to_text(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

pub fn log_level_from_text(s: &str) -> Result<LogLevel> {
    match s {
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warn" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        other => Err(PipelineError::internal(format!("unknown log level in row: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_round_trips_through_text() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            let text = job_status_to_text(status);
            assert_eq!(job_status_from_text(text).unwrap(), status);
        }
    }

    #[test]
    fn agent_type_round_trips_through_text() {
        for agent_type in AgentType::ALL {
            let text = agent_type_to_text(agent_type);
            assert_eq!(agent_type_from_text(text).unwrap(), agent_type);
        }
    }

    #[test]
    fn unknown_status_text_is_an_internal_error() {
        assert!(job_status_from_text("bogus").is_err());
    }
}
