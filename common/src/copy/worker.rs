use std::os::unix::fs::PermissionsExt;

use anyhow::Context;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::instrument;

use super::Summary;
use crate::listing::SourceEntry;
use crate::partition::Stride;

/// Size of the copy buffer each worker allocates once and reuses for all of its files.
pub const BUFFER_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Copied(u64),
    SkippedDirectory,
}

/// One copy worker: the slice of the shared listing it owns plus where to read and write.
pub struct Worker {
    pub id: usize,
    pub stride: Stride,
    pub entries: std::sync::Arc<[SourceEntry]>,
    pub src: std::path::PathBuf,
    pub dst: std::path::PathBuf,
}

impl Worker {
    /// Copy every assigned entry, then hand the accumulated [`Summary`] to `done`.
    ///
    /// Per-file failures are logged and counted, they never stop the loop.
    #[instrument(skip_all, fields(worker = self.id))]
    pub async fn run(self, done: tokio::sync::oneshot::Sender<Summary>) {
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut summary = Summary::default();
        for idx in self.stride {
            let entry = &self.entries[idx];
            let src = self.src.join(&entry.name);
            let dst = self.dst.join(&entry.name);
            match copy_entry(&src, &dst, &mut buffer).await {
                Ok(Outcome::Copied(bytes)) => {
                    summary.files_copied += 1;
                    summary.bytes_copied += bytes;
                }
                Ok(Outcome::SkippedDirectory) => {
                    tracing::debug!("{src:?} is a directory, skipping");
                    summary.directories_skipped += 1;
                }
                Err(error) => {
                    tracing::error!("{:#}", &error);
                    summary.files_failed += 1;
                }
            }
        }
        if done.send(summary).is_err() {
            tracing::debug!("result receiver is gone, dropping summary");
        }
    }
}

#[instrument(skip(buffer))]
async fn copy_entry(
    src: &std::path::Path,
    dst: &std::path::Path,
    buffer: &mut [u8],
) -> anyhow::Result<Outcome> {
    tracing::debug!("opening 'src' for reading");
    let mut reader = tokio::fs::File::open(src)
        .await
        .with_context(|| format!("cannot open {src:?} for reading"))?;
    let src_metadata = reader
        .metadata()
        .await
        .with_context(|| format!("failed reading metadata from {src:?}"))?;
    if src_metadata.is_dir() {
        return Ok(Outcome::SkippedDirectory);
    }
    tracing::debug!("opening 'dst' for writing");
    let mut writer = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(src_metadata.permissions().mode())
        .open(dst)
        .await
        .with_context(|| format!("cannot open {dst:?} for writing"))?;
    // the creation mode is masked by umask and ignored for files that already existed
    writer
        .set_permissions(src_metadata.permissions())
        .await
        .with_context(|| {
            format!(
                "cannot set {:?} permissions to {:o}",
                dst,
                src_metadata.permissions().mode()
            )
        })?;
    tracing::debug!("copying data");
    let bytes = copy_buffered(&mut reader, &mut writer, buffer)
        .await
        .with_context(|| format!("failed copying {src:?} to {dst:?}"))?;
    Ok(Outcome::Copied(bytes))
}

async fn copy_buffered<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut [u8],
) -> std::io::Result<u64>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut total = 0;
    loop {
        let read = reader.read(buffer).await?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read]).await?;
        total += read as u64;
    }
    // tokio files write in the background, flush to surface errors from the last write
    writer.flush().await?;
    Ok(total)
}
