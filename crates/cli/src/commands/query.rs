use crate::context::Context;
use eyre::eyre;
use std::sync::Arc;
use zpress_core::{TaskId, NO_COMPRESSION_TASK};

pub async fn status(context: Arc<Context>, task_id: String) -> eyre::Result<()> {
    let service = context.service()?;
    match service.query_compression_status(&TaskId::from(task_id))? {
        Some(task) => println!("{}", serde_json::to_string_pretty(&task)?),
        None => println!("{NO_COMPRESSION_TASK}"),
    }
    Ok(())
}

pub async fn file_status(context: Arc<Context>, file_id: String) -> eyre::Result<()> {
    let service = context.service()?;
    match service.query_status_for_file(&file_id)? {
        Some(task) => println!("{}", serde_json::to_string_pretty(&task)?),
        None => println!("{NO_COMPRESSION_TASK}"),
    }
    Ok(())
}

pub async fn stats(context: Arc<Context>) -> eyre::Result<()> {
    let snapshot = context.load_statistics()?.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub async fn materialize(context: Arc<Context>, task_id: String) -> eyre::Result<()> {
    let cache = context.cache()?;
    let path = tokio::task::spawn_blocking(move || -> eyre::Result<_> {
        let service = context.service()?;
        let path = service.materialize(&TaskId::from(task_id), &cache)?;
        service.shutdown();
        Ok(path)
    })
    .await
    .map_err(|e| eyre!("materialize task failed: {e}"))??;

    println!("{}", path.display());
    Ok(())
}
