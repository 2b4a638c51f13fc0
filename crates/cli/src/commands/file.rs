use crate::context::Context;
use eyre::{eyre, WrapErr};
use std::path::PathBuf;
use std::sync::Arc;
use zpress_core::CompressionLevel;

pub async fn compress(
    context: Arc<Context>,
    input: PathBuf,
    output: PathBuf,
    level: CompressionLevel,
) -> eyre::Result<()> {
    let engine = context.engine();
    let (source, target) = (input.clone(), output.clone());
    let summary = tokio::task::spawn_blocking(move || engine.try_compress(&source, &target, level))
        .await
        .map_err(|e| eyre!("compression task failed: {e}"))?
        .wrap_err_with(|| format!("failed to compress '{}'", input.display()))?;

    let ratio = if summary.bytes_read == 0 {
        1.0
    } else {
        summary.bytes_written as f64 / summary.bytes_read as f64
    };
    println!(
        "{} -> {}: {} -> {} bytes (ratio {ratio:.3}, level {level})",
        input.display(),
        output.display(),
        summary.bytes_read,
        summary.bytes_written,
    );
    Ok(())
}

pub async fn decompress(context: Arc<Context>, input: PathBuf, output: PathBuf) -> eyre::Result<()> {
    let engine = context.engine();
    let (source, target) = (input.clone(), output.clone());
    let summary = tokio::task::spawn_blocking(move || engine.try_decompress(&source, &target))
        .await
        .map_err(|e| eyre!("decompression task failed: {e}"))?
        .wrap_err_with(|| format!("failed to decompress '{}'", input.display()))?;

    println!(
        "{} -> {}: {} bytes restored",
        input.display(),
        output.display(),
        summary.bytes_written,
    );
    Ok(())
}
