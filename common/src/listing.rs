use anyhow::Context;
use std::os::unix::fs::PermissionsExt;
use tracing::instrument;

/// One top-level item of the source directory, captured at listing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub name: std::ffi::OsString,
    pub mode: u32,
    pub is_dir: bool,
    pub size: u64,
}

/// List the immediate entries of `dir`, sorted by name. Does not recurse.
///
/// Entry metadata is read without following symlinks, same as a plain `ls -l`.
#[instrument]
pub async fn list_entries(dir: &std::path::Path) -> anyhow::Result<Vec<SourceEntry>> {
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("cannot open directory {dir:?} for reading"))?;
    let mut entries = vec![];
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .with_context(|| format!("failed traversing directory {dir:?}"))?
    {
        let metadata = entry
            .metadata()
            .await
            .with_context(|| format!("failed reading metadata from {:?}", entry.path()))?;
        entries.push(SourceEntry {
            name: entry.file_name(),
            mode: metadata.permissions().mode(),
            is_dir: metadata.is_dir(),
            size: metadata.len(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!("listed {} entries", entries.len());
    Ok(entries)
}
