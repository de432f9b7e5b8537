use crate::infra::Backend;
use clap::Args;
use groundcheck::config::{AppConfig, StoreBackend};
use groundcheck::error::AppError;
use groundcheck::reconciliation::{
    reset_admin, JobReport, OfficerImportJob, RegionFlagJob, StatusReconciliation,
};
use groundcheck::telemetry;
use std::path::PathBuf;
use tracing::warn;

#[derive(Args, Debug)]
pub(crate) struct FileArgs {
    /// CSV source; the first row is a header and is ignored
    #[arg(long)]
    pub(crate) file: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct ResetAdminArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) password: String,
    #[arg(long, default_value = "Administrator")]
    pub(crate) name: String,
}

async fn job_backend() -> Result<Backend, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    if config.store == StoreBackend::Memory {
        warn!("job is running against the in-memory store; changes will not persist");
    }
    Backend::open(&config).await
}

fn print_report(job: &str, report: &JobReport) {
    println!("{job} finished");
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("report unavailable: {err}"),
    }
}

pub(crate) async fn run_status_reconciliation(args: FileArgs) -> Result<(), AppError> {
    let backend = job_backend().await?;
    let job = StatusReconciliation::new(backend.stores.records.clone(), backend.clock.clone());
    let report = job.run_path(&args.file).await?;
    print_report("status reconciliation", &report);
    Ok(())
}

pub(crate) async fn run_region_flags(args: FileArgs) -> Result<(), AppError> {
    let backend = job_backend().await?;
    let job = RegionFlagJob::new(backend.stores.regions.clone());
    let report = job.run_path(&args.file).await?;
    print_report("region allow-new update", &report);
    Ok(())
}

pub(crate) async fn run_officer_import(args: FileArgs) -> Result<(), AppError> {
    let backend = job_backend().await?;
    let job = OfficerImportJob::new(backend.stores.officers.clone(), backend.scheme.clone());
    let report = job.run_path(&args.file).await?;
    print_report("officer import", &report);
    Ok(())
}

pub(crate) async fn run_reset_admin(args: ResetAdminArgs) -> Result<(), AppError> {
    let backend = job_backend().await?;
    let account = reset_admin(
        backend.stores.officers.as_ref(),
        backend.scheme.as_ref(),
        &args.name,
        &args.email,
        &args.password,
    )
    .await?;
    println!(
        "administrator {} <{}> ready",
        account.identity.name, account.identity.email
    );
    Ok(())
}
