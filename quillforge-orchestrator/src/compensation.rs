//! ABOUTME: Graceful compensation hook (SPEC_FULL §3) for rolling back a job's
//! ABOUTME: partial side effects — currently just its `page_id` link — on failure

use async_trait::async_trait;
use quillforge_core::job::Job;

/// Invoked once a job has failed after Project Manager has already run and
/// left behind a partial artifact (e.g. a linked `page_id`). Agents themselves
/// are stateless (§4.3), so this is the only compensable side effect in this
/// pipeline; a no-op default is correct until a real CMS integration exists.
#[async_trait]
pub trait CompensationHook: Send + Sync {
    async fn compensate(&self, job: &Job);
}

pub struct NoopCompensationHook;

#[async_trait]
impl CompensationHook for NoopCompensationHook {
    async fn compensate(&self, _job: &Job) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use quillforge_core::job::JobSettings;

    #[tokio::test]
    async fn noop_hook_does_nothing_observable() {
        let job = Job::new("kw".into(), JobSettings::default(), 0, "tester".into());
        NoopCompensationHook.compensate(&job).await;
    }
}
