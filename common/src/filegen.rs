use anyhow::{Context, anyhow};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct Error {
    #[source]
    pub source: anyhow::Error,
    pub summary: Summary,
}

impl Error {
    pub fn new(source: anyhow::Error, summary: Summary) -> Self {
        Error { source, summary }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Summary {
    pub files_created: usize,
    pub bytes_written: u64,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            files_created: self.files_created + other.files_created,
            bytes_written: self.bytes_written + other.bytes_written,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "files created: {}\n\
            bytes written: {}",
            self.files_created,
            bytesize::ByteSize(self.bytes_written)
        )
    }
}

#[instrument]
pub async fn write_file(
    path: std::path::PathBuf,
    mut filesize: usize,
    bufsize: usize,
) -> Result<Summary, Error> {
    use rand::Rng;
    use tokio::io::AsyncWriteExt;
    let original_filesize = filesize;
    let mut bytes = vec![0u8; bufsize.max(1)];
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .with_context(|| format!("Error opening {:?}", &path))
        .map_err(|err| Error::new(err, Default::default()))?;
    while filesize > 0 {
        {
            // make sure rng falls out of scope before await
            let mut rng = rand::thread_rng();
            rng.fill(&mut bytes[..]);
        }
        let writesize = std::cmp::min(filesize, bytes.len());
        file.write_all(&bytes[..writesize])
            .await
            .with_context(|| format!("Error writing to {:?}", &path))
            .map_err(|err| Error::new(err, Default::default()))?;
        filesize -= writesize;
    }
    file.flush()
        .await
        .with_context(|| format!("Error writing to {:?}", &path))
        .map_err(|err| Error::new(err, Default::default()))?;
    Ok(Summary {
        files_created: 1,
        bytes_written: original_filesize as u64,
    })
}

/// Create `numfiles` files named `file0`, `file1`, ... directly under `root`, each `filesize`
/// bytes of random data.
///
/// At most `max_open_files` files are being written at any time, 0 means no limit.
#[instrument]
pub async fn filegen(
    root: &std::path::Path,
    numfiles: usize,
    filesize: usize,
    bufsize: usize,
    max_open_files: usize,
) -> Result<Summary, Error> {
    let limit = if max_open_files == 0 {
        tokio::sync::Semaphore::MAX_PERMITS
    } else {
        max_open_files
    };
    let open_files = std::sync::Arc::new(tokio::sync::Semaphore::new(limit));
    let mut join_set = tokio::task::JoinSet::new();
    for i in 0..numfiles {
        let path = root.join(format!("file{i}"));
        let permit = open_files
            .clone()
            .acquire_owned()
            .await
            .context("open files limit was closed")
            .map_err(|err| Error::new(err, Default::default()))?;
        join_set.spawn(async move {
            let result = write_file(path, filesize, bufsize).await;
            drop(permit);
            result
        });
    }
    let mut success = true;
    let mut filegen_summary = Summary::default();
    while let Some(res) = join_set.join_next().await {
        let res = res.map_err(|err| {
            Error::new(
                anyhow::Error::new(err).context("filegen task failed"),
                filegen_summary,
            )
        })?;
        match res {
            Ok(summary) => filegen_summary = filegen_summary + summary,
            Err(error) => {
                tracing::error!("filegen: {:?} failed with: {:#}", root, &error);
                filegen_summary = filegen_summary + error.summary;
                success = false;
            }
        }
    }
    if !success {
        return Err(Error::new(
            anyhow!("filegen: {:?} failed!", &root),
            filegen_summary,
        ));
    }
    Ok(filegen_summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_flat_filegen() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::tempdir()?;
        let test_path = tmp_dir.path();
        let summary = filegen(test_path, 5, 200, 64, 0).await?;
        assert_eq!(summary.files_created, 5);
        assert_eq!(summary.bytes_written, 1000); // 200 × 5
        for i in 0..5 {
            let metadata = tokio::fs::metadata(test_path.join(format!("file{i}"))).await?;
            assert!(metadata.is_file());
            assert_eq!(metadata.len(), 200);
        }
        assert!(!test_path.join("file5").exists());
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn test_empty_files() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::tempdir()?;
        let summary = filegen(tmp_dir.path(), 3, 0, 64, 0).await?;
        assert_eq!(summary.files_created, 3);
        assert_eq!(summary.bytes_written, 0);
        assert_eq!(tokio::fs::metadata(tmp_dir.path().join("file2")).await?.len(), 0);
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn test_existing_file_fails() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::tempdir()?;
        tokio::fs::write(tmp_dir.path().join("file1"), "taken").await?;
        let error = filegen(tmp_dir.path(), 3, 10, 64, 2).await.unwrap_err();
        assert_eq!(error.summary.files_created, 2);
        assert_eq!(error.summary.bytes_written, 20);
        // pre-existing file is left alone
        assert_eq!(tokio::fs::read(tmp_dir.path().join("file1")).await?, b"taken");
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn test_more_files_than_open_files_limit() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::tempdir()?;
        let summary = filegen(tmp_dir.path(), 300, 1024, 256, 4).await?;
        assert_eq!(summary.files_created, 300);
        assert_eq!(summary.bytes_written, 300 * 1024);
        let mut entries = tokio::fs::read_dir(tmp_dir.path()).await?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            assert_eq!(entry.metadata().await?.len(), 1024);
            count += 1;
        }
        assert_eq!(count, 300);
        Ok(())
    }
}
