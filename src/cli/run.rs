use std::path::Path;

use crate::{
    config::Settings,
    error, info,
    process::{self, ProcessKind},
    success,
};

pub async fn run(kind: ProcessKind, settings_path: &Path) {
    let settings = match Settings::load(settings_path).await {
        Ok(s) => s,
        Err(e) => error!("Cannot load configuration: {}", e),
    };

    let mut job = match process::build(kind, &settings).await {
        Ok(job) => job,
        Err(e) => error!("Cannot build process {}: {}", kind.process_name(), e),
    };

    info!(
        "Running {} against {}",
        job.name(),
        settings.storage.base_path
    );

    match process::execute(job.as_mut()).await {
        Ok(()) => success!("Process {} finished.", job.name()),
        Err(e) => error!("Process {} failed: {}", job.name(), e),
    }
}
