use std::path::{Path, PathBuf};
use std::process::ExitCode;

use doc_signer::config::job::{JobFile, Placement};
use doc_signer::config::merged::MergedConfig;
use doc_signer::config::{self};
use doc_signer::pipeline::job_runner::{JobConfig, PlacementConfig};
use doc_signer::pipeline::orchestrator::run_all_jobs;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: doc_signer <jobs.yaml>...");
        eprintln!("  Place signatures and initials on documents and export them.");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("doc_signer {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let mut job_configs: Vec<JobConfig> = Vec::new();

    for job_file_arg in &args {
        let job_file_path = Path::new(job_file_arg);

        // Load settings from the same directory as the job file.
        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let yaml_content = match std::fs::read_to_string(job_file_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to read job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_file: JobFile = match serde_yml::from_str(&yaml_content) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: Failed to parse job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        // Resolve job file directory for relative paths.
        let job_dir = job_file_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        for job in &job_file.jobs {
            let merged = MergedConfig::new(&settings, job);
            if let Err(e) = merged.validate() {
                eprintln!("ERROR: {}: {e}", job.input);
                return ExitCode::FAILURE;
            }

            let placement = |p: &Placement| PlacementConfig {
                image_path: resolve_path(&job_dir, &p.image),
                page: p.page,
                offset: p.offset.map(|[dx, dy]| (dx, dy)),
                scale: p.scale,
                angle: p.angle,
            };

            job_configs.push(JobConfig {
                input_path: resolve_path(&job_dir, &job.input),
                output_dir: resolve_path(&job_dir, &job.output_dir),
                settings: merged.settings,
                format: job.export_format(),
                all_pages: job.all_pages,
                page_range: job.page_range(),
                signature: job.signature.as_ref().map(placement),
                initial: job.initial.as_ref().map(placement),
            });
        }
    }

    let results = run_all_jobs(&job_configs).await;

    let mut has_error = false;
    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(job_result) => {
                eprintln!(
                    "OK: {} -> {} ({} pages)",
                    job_result.input_path.display(),
                    job_result.output_path.display(),
                    job_result.pages_exported
                );
            }
            Err(e) => {
                eprintln!(
                    "ERROR: {} -> {}: {e}",
                    job_configs[i].input_path.display(),
                    job_configs[i].output_dir.display()
                );
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
