use crate::context::Context;
use eyre::{eyre, WrapErr};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;
use zpress_core::{CompressionLevel, FileRef, COMPRESSED_SUFFIX};

#[derive(Serialize)]
struct BatchLine {
    file: String,
    task_id: Option<String>,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

pub async fn execute(
    context: Arc<Context>,
    dir: PathBuf,
    level: Option<CompressionLevel>,
    timeout: u64,
) -> eyre::Result<()> {
    if !dir.is_dir() {
        return Err(eyre!("'{}' is not a directory", dir.display()));
    }

    tokio::task::spawn_blocking(move || run(&context, &dir, level, Duration::from_secs(timeout)))
        .await
        .map_err(|e| eyre!("batch task failed: {e}"))?
}

fn run(
    context: &Context,
    dir: &Path,
    level: Option<CompressionLevel>,
    timeout: Duration,
) -> eyre::Result<()> {
    let service = context.service()?;
    let files = collect_files(dir);
    tracing::info!(files = files.len(), dir = %dir.display(), "scheduling batch");

    let mut scheduled = Vec::new();
    for path in files {
        let file_id = path
            .strip_prefix(dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        let file = FileRef::new(file_id.clone(), "cli", &path);

        let task_id = match level {
            Some(level) => Some(service.schedule_compression(&file, level)?),
            None => service.schedule_auto(&file)?,
        };
        scheduled.push((file_id, task_id));
    }

    let mut lines = Vec::with_capacity(scheduled.len());
    for (file, task_id) in scheduled {
        let line = match task_id {
            None => BatchLine {
                file,
                task_id: None,
                status: "SKIPPED".to_string(),
                level: None,
                note: Some("not worth compressing".to_string()),
            },
            Some(id) => {
                let task = service
                    .wait_for(&id, timeout)?
                    .ok_or_else(|| eyre!("task {id} disappeared from the store"))?;
                BatchLine {
                    file,
                    task_id: Some(id.to_string()),
                    status: task.status.to_string(),
                    level: Some(task.level.value()),
                    note: task.error_message,
                }
            }
        };
        lines.push(line);
    }

    service.shutdown();

    for line in &lines {
        println!("{}", serde_json::to_string(line)?);
    }

    let snapshot = service.query_stats();
    context
        .save_statistics(&snapshot)
        .wrap_err("failed to persist statistics")?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Regular files under `dir`, skipping artifacts from earlier runs
fn collect_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| !path.to_string_lossy().ends_with(COMPRESSED_SUFFIX))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_skips_artifacts_and_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(temp_dir.path().join("b.txt"), b"b").unwrap();
        std::fs::write(temp_dir.path().join("b.txt.z"), b"z").unwrap();
        std::fs::write(nested.join("a.log"), b"a").unwrap();

        let files = collect_files(temp_dir.path());
        assert_eq!(files, vec![temp_dir.path().join("b.txt"), nested.join("a.log")]);
    }
}
