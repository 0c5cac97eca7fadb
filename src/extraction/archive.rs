//! Selective extraction of log members from collected zip archives.
//!
//! Archives produced by the collection tool nest every log under a `System/`
//! directory. Matching members are extracted with their internal layout, then
//! flattened into the target directory and the emptied `System/` removed.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

use crate::logging::structured::LogContext;

/// Directory the collection tool nests archive members under.
pub const NESTED_DIR: &str = "System";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive not found: {path}")]
    NotFound { path: PathBuf },
    #[error("corrupt archive {path}: {source}")]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("expected layout directory missing: {path}")]
    MissingLayout { path: PathBuf },
    #[error("failed to read archive member {index} of {path}: {source}")]
    Member {
        path: PathBuf,
        index: usize,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ArchiveError {
    fn io(path: &Path, source: io::Error) -> Self {
        ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Create `target` and its parents; an existing directory is fine, an existing
/// non-directory is an error.
pub async fn create_log_dir(target: &Path) -> Result<(), ArchiveError> {
    tokio::fs::create_dir_all(target)
        .await
        .map_err(|source| ArchiveError::CreateDir {
            path: target.to_path_buf(),
            source,
        })?;
    log::debug!("LOG_DIR_CREATED path={}", target.display());
    Ok(())
}

/// Extract members ending with `member_suffix` from `archive` into `target`.
///
/// Returns, sorted, the files this archive placed directly in `target` once the
/// nested layout directory has been folded away. Files already in `target` are
/// not reported. `target` must already exist.
pub async fn extract(
    archive: &Path,
    target: &Path,
    member_suffix: &str,
    ctx: &LogContext,
) -> Result<Vec<PathBuf>, ArchiveError> {
    log::info!("{} EXTRACT_START target={}", ctx, target.display());

    if tokio::fs::metadata(archive).await.is_err() {
        log::error!("{} EXTRACT_FAILED reason=not_found", ctx);
        return Err(ArchiveError::NotFound {
            path: archive.to_path_buf(),
        });
    }

    let file = File::open(archive).map_err(|e| ArchiveError::io(archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|source| {
        log::error!("{} EXTRACT_FAILED reason=corrupt error={}", ctx, source);
        ArchiveError::CorruptArchive {
            path: archive.to_path_buf(),
            source,
        }
    })?;

    let total = zip.len();
    let mut written = Vec::new();
    for index in 0..total {
        let archive_path = archive.to_path_buf();
        let target_dir = target.to_path_buf();
        let suffix = member_suffix.to_string();
        let member_ctx = ctx.clone();
        // Member writes are blocking i/o.
        let (returned, member) = tokio::task::spawn_blocking(move || {
            let member = extract_member(
                &mut zip,
                index,
                &archive_path,
                &target_dir,
                &suffix,
                &member_ctx,
            );
            (zip, member)
        })
        .await?;
        zip = returned;

        if let Some(path) = member? {
            written.push(path);
        }
        tokio::task::yield_now().await;
    }

    log::info!(
        "{} EXTRACT_MEMBERS suffix={} extracted={} total={}",
        ctx,
        member_suffix,
        written.len(),
        total
    );

    let nested = target.join(NESTED_DIR);
    let mut files = move_files_to_target(&nested, target, ctx).await?;
    remove_folder(&nested, ctx).await?;

    files.extend(
        written
            .into_iter()
            .filter(|path| path.parent() == Some(target)),
    );
    files.sort();
    files.dedup();
    log::info!("{} EXTRACT_COMPLETE files={}", ctx, files.len());
    Ok(files)
}

/// Extract one member when its name ends with `member_suffix`, returning the
/// path it was written to.
fn extract_member(
    zip: &mut ZipArchive<File>,
    index: usize,
    archive: &Path,
    target: &Path,
    member_suffix: &str,
    ctx: &LogContext,
) -> Result<Option<PathBuf>, ArchiveError> {
    let mut entry = zip.by_index(index).map_err(|source| ArchiveError::Member {
        path: archive.to_path_buf(),
        index,
        source,
    })?;

    if entry.is_dir() || !entry.name().ends_with(member_suffix) {
        return Ok(None);
    }

    let Some(relative) = entry.enclosed_name() else {
        log::warn!(
            "{} MEMBER_SKIPPED reason=unsafe_path name={}",
            ctx,
            entry.name()
        );
        return Ok(None);
    };
    let out_path = target.join(relative);

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
    }
    let mut out = File::create(&out_path).map_err(|e| ArchiveError::io(&out_path, e))?;
    io::copy(&mut entry, &mut out).map_err(|e| ArchiveError::io(&out_path, e))?;

    log::debug!(
        "{} MEMBER_EXTRACTED name={} path={}",
        ctx,
        entry.name(),
        out_path.display()
    );
    Ok(Some(out_path))
}

/// Move every entry of `nested` up into `target`, returning the moved files.
pub async fn move_files_to_target(
    nested: &Path,
    target: &Path,
    ctx: &LogContext,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut entries = match tokio::fs::read_dir(nested).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::error!("{} LAYOUT_MISSING path={}", ctx, nested.display());
            return Err(ArchiveError::MissingLayout {
                path: nested.to_path_buf(),
            });
        }
        Err(e) => return Err(ArchiveError::io(nested, e)),
    };

    let mut moved = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ArchiveError::io(nested, e))?
    {
        let is_file = entry
            .file_type()
            .await
            .map_err(|e| ArchiveError::io(&entry.path(), e))?
            .is_file();
        let destination = target.join(entry.file_name());
        tokio::fs::rename(entry.path(), &destination)
            .await
            .map_err(|e| ArchiveError::io(&destination, e))?;
        log::debug!(
            "{} FILE_MOVED from={} to={}",
            ctx,
            entry.path().display(),
            destination.display()
        );
        if is_file {
            moved.push(destination);
        }
    }
    Ok(moved)
}

/// Move staged files into `log_dir`, each renamed to `<prefix>_<file name>`.
///
/// Archives that share a log directory use distinct prefixes, so their files
/// never replace each other.
pub async fn publish_files(
    staged: &[PathBuf],
    log_dir: &Path,
    prefix: &str,
    ctx: &LogContext,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut published = Vec::with_capacity(staged.len());
    for path in staged {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let destination = log_dir.join(format!("{}_{}", prefix, name));
        tokio::fs::rename(path, &destination)
            .await
            .map_err(|e| ArchiveError::io(&destination, e))?;
        log::debug!(
            "{} FILE_PUBLISHED from={} to={}",
            ctx,
            path.display(),
            destination.display()
        );
        published.push(destination);
    }
    Ok(published)
}

/// Remove the emptied layout directory.
pub async fn remove_folder(path: &Path, ctx: &LogContext) -> Result<(), ArchiveError> {
    match tokio::fs::remove_dir(path).await {
        Ok(()) => {
            log::debug!("{} FOLDER_REMOVED path={}", ctx, path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ArchiveError::MissingLayout {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(ArchiveError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, body) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn ctx() -> LogContext {
        LogContext::new("run-test").with_archive("test.zip")
    }

    #[tokio::test]
    async fn test_extract_flattens_system_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("GBLogs_node1_fanapiservice_1657563227839.zip");
        write_zip(
            &archive,
            &[
                ("System/fanapiservice.log", "INFO | a\n"),
                ("System/smb3_1.log", "INFO | b\n"),
                ("System/readme.txt", "ignored"),
            ],
        );
        let target = tmp.path().join("out/node1/fanapiservice");
        create_log_dir(&target).await.unwrap();

        let files = extract(&archive, &target, "service.log", &ctx())
            .await
            .unwrap();

        assert_eq!(files, vec![target.join("fanapiservice.log")]);
        assert!(!target.join(NESTED_DIR).exists());
        assert_eq!(
            std::fs::read_to_string(target.join("fanapiservice.log")).unwrap(),
            "INFO | a\n"
        );
    }

    #[tokio::test]
    async fn test_extract_reports_only_its_own_files() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("GBLogs_node1_fanapiservice_1657563299999.zip");
        write_zip(&archive, &[("System/fanapiservice.log", "from run B\n")]);
        let target = tmp.path().join("staging");
        create_log_dir(&target).await.unwrap();
        std::fs::write(target.join("stale.log"), "from run A\n").unwrap();

        let files = extract(&archive, &target, "service.log", &ctx())
            .await
            .unwrap();

        assert_eq!(files, vec![target.join("fanapiservice.log")]);
        assert!(target.join("stale.log").is_file());
    }

    #[tokio::test]
    async fn test_publish_files_prefixes_names() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tmp.path().join("staging");
        let log_dir = tmp.path().join("out/node1/fanapiservice");
        create_log_dir(&staging).await.unwrap();
        create_log_dir(&log_dir).await.unwrap();
        std::fs::write(log_dir.join("run-a_fanapiservice.log"), "from run A\n").unwrap();
        let staged = staging.join("fanapiservice.log");
        std::fs::write(&staged, "from run B\n").unwrap();

        let published = publish_files(&[staged.clone()], &log_dir, "run-b", &ctx())
            .await
            .unwrap();

        assert_eq!(published, vec![log_dir.join("run-b_fanapiservice.log")]);
        assert!(!staged.exists());
        assert_eq!(
            std::fs::read_to_string(log_dir.join("run-a_fanapiservice.log")).unwrap(),
            "from run A\n"
        );
        assert_eq!(
            std::fs::read_to_string(&published[0]).unwrap(),
            "from run B\n"
        );
    }

    #[tokio::test]
    async fn test_extract_missing_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let result = extract(
            &tmp.path().join("missing.zip"),
            tmp.path(),
            "service.log",
            &ctx(),
        )
        .await;
        assert!(matches!(result, Err(ArchiveError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_extract_corrupt_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("corrupt.zip");
        std::fs::write(&archive, b"this is not a zip file").unwrap();

        let result = extract(&archive, tmp.path(), "service.log", &ctx()).await;
        assert!(matches!(result, Err(ArchiveError::CorruptArchive { .. })));
    }

    #[tokio::test]
    async fn test_extract_without_matching_members() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("other.zip");
        write_zip(&archive, &[("System/notes.txt", "nothing")]);
        let target = tmp.path().join("target");
        create_log_dir(&target).await.unwrap();

        let result = extract(&archive, &target, "service.log", &ctx()).await;
        assert!(matches!(result, Err(ArchiveError::MissingLayout { .. })));
    }

    #[tokio::test]
    async fn test_create_log_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a/b/c");
        create_log_dir(&target).await.unwrap();
        create_log_dir(&target).await.unwrap();
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn test_create_log_dir_conflicts_with_file() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("occupied");
        std::fs::write(&target, b"file").unwrap();
        let result = create_log_dir(&target).await;
        assert!(matches!(result, Err(ArchiveError::CreateDir { .. })));
    }
}
