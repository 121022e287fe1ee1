use std::os::unix::fs::PermissionsExt;

pub const MIB: usize = 1024 * 1024;

async fn write_with_mode(path: &std::path::Path, contents: &[u8], mode: u32) -> anyhow::Result<()> {
    tokio::fs::write(path, contents).await?;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    Ok(())
}

/// Deterministic, non-repeating-looking payload so a misplaced chunk would be noticed.
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i % 251) as u8 ^ seed.wrapping_mul(31))
        .collect()
}

pub async fn setup_flat_dir() -> anyhow::Result<tempfile::TempDir> {
    let tmp_dir = tempfile::tempdir()?;
    // foo
    // |- 0.bin  (1 MiB, 0640)
    // |- 1.bin  (2 MiB, 0755)
    // |- 2.bin  (empty, 0600)
    // |- sub
    //    |- 3.bin (never copied)
    let foo_path = tmp_dir.path().join("foo");
    tokio::fs::create_dir(&foo_path).await?;
    write_with_mode(&foo_path.join("0.bin"), &payload(MIB, 0), 0o640).await?;
    write_with_mode(&foo_path.join("1.bin"), &payload(2 * MIB, 1), 0o755).await?;
    write_with_mode(&foo_path.join("2.bin"), &[], 0o600).await?;
    let sub_path = foo_path.join("sub");
    tokio::fs::create_dir(&sub_path).await?;
    tokio::fs::write(sub_path.join("3.bin"), "3").await?;
    Ok(tmp_dir)
}

/// Populate `dir` with `count` small files named `file{i}`, file `i` being `i * 100` bytes long.
pub async fn populate(dir: &std::path::Path, count: usize) -> anyhow::Result<u64> {
    let mut total = 0;
    for i in 0..count {
        let contents = payload(i * 100, i as u8);
        tokio::fs::write(dir.join(format!("file{i}")), &contents).await?;
        total += contents.len() as u64;
    }
    Ok(total)
}
