// 全ジョブ実行

use tracing::warn;

use crate::pipeline::job_runner::{JobConfig, JobResult, run_job};

/// Run multiple jobs in order, collecting results.
/// One job failure does NOT prevent other jobs from running.
pub async fn run_all_jobs(jobs: &[JobConfig]) -> Vec<crate::error::Result<JobResult>> {
    let mut results = Vec::with_capacity(jobs.len());
    for job in jobs {
        let result = run_job(job).await;
        if let Err(e) = &result {
            warn!(input = %job.input_path.display(), error = %e, "job failed");
        }
        results.push(result);
    }
    results
}
