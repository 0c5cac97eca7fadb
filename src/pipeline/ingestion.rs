//! Main log ingestion pipeline.
//!
//! Coordinates one run over the source directory:
//! 1. Discover archives and derive node/category from their names
//! 2. Extract matching members of every archive (fan-out per archive)
//! 3. Coalesce and parse every extracted file (fan-out per file)
//! 4. Bulk-insert each file's records (fan-out per non-empty file)
//! 5. Read everything back, newest first

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinError;
use uuid::Uuid;

use crate::config::{ConfigError, Settings};
use crate::conversion::record::{parse, ParseError};
use crate::extraction::archive::{create_log_dir, extract, publish_files, ArchiveError};
use crate::logging::structured::LogContext;
use crate::model::entry::JavaLogEntry;
use crate::model::files::{ArchiveFile, ExtractedLogFile, ModelError, ARCHIVE_EXTENSION};
use crate::storage::queries::LogQuery;
use crate::storage::store::{InsertManyResult, LogStore, StoreError};

use super::context::RunContext;
use super::fanout::FanOut;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no archives found in {dir}")]
    NoArchives { dir: PathBuf },
    /// Guard for an empty extraction plan. Discovery already rejects an empty
    /// source directory, so a run only reaches this when planning is handed no archives.
    #[error("no extraction tasks were scheduled")]
    NoExtractionTasks,
    #[error("cannot derive node and log category from {path}: {source}")]
    InvalidArchiveName {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
    #[error("cannot read source directory {dir}: {source}")]
    SourceDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("working copy failed for {path}: {source}")]
    WorkingCopy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("pipeline task failed to complete: {0}")]
    TaskJoin(#[from] JoinError),
}

/// Where a run currently is. `Done` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    Extracting,
    Converting,
    Inserting,
    Querying,
    Done,
    Aborted,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Idle => "idle",
            RunStage::Extracting => "extracting",
            RunStage::Converting => "converting",
            RunStage::Inserting => "inserting",
            RunStage::Querying => "querying",
            RunStage::Done => "done",
            RunStage::Aborted => "aborted",
        }
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub stage: RunStage,
    pub archives_processed: usize,
    pub files_converted: usize,
    pub records_inserted: usize,
    pub inserted_ids: Vec<Uuid>,
    /// Every stored record, newest first.
    pub records: Vec<JavaLogEntry>,
}

/// One archive scheduled for extraction.
#[derive(Debug, Clone)]
struct ExtractionTask {
    archive: ArchiveFile,
    target: PathBuf,
    ctx: LogContext,
}

/// Drives extraction, conversion and storage for one source directory.
pub struct Pipeline {
    settings: Arc<Settings>,
    store: Arc<dyn LogStore>,
    stage: RunStage,
}

impl Pipeline {
    pub fn new(settings: Settings, store: Arc<dyn LogStore>) -> Self {
        Self {
            settings: Arc::new(settings),
            store,
            stage: RunStage::Idle,
        }
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    /// Run every stage once. Any fatal error leaves the pipeline `Aborted`.
    pub async fn run(&mut self) -> Result<RunReport, PipelineError> {
        let run = RunContext::new();
        let ctx = run.log_context();
        log::info!(
            "{} RUN_START sourcedir={} outdir={}",
            ctx,
            self.settings.sourcedir.display(),
            self.settings.outdir.display()
        );

        match self.run_stages(&run, &ctx).await {
            Ok(report) => {
                self.enter(RunStage::Done, &ctx);
                log::info!(
                    "{} RUN_COMPLETE archives={} files={} inserted={} elapsed_ms={}",
                    ctx,
                    report.archives_processed,
                    report.files_converted,
                    report.records_inserted,
                    run.elapsed_ms()
                );
                Ok(RunReport {
                    stage: RunStage::Done,
                    ..report
                })
            }
            Err(err) => {
                log::error!(
                    "{} RUN_ABORTED stage={} error={}",
                    ctx,
                    self.stage.as_str(),
                    err
                );
                self.stage = RunStage::Aborted;
                Err(err)
            }
        }
    }

    fn enter(&mut self, stage: RunStage, ctx: &LogContext) {
        log::info!(
            "{} STAGE_ENTER from={} to={}",
            ctx,
            self.stage.as_str(),
            stage.as_str()
        );
        self.stage = stage;
    }

    async fn run_stages(
        &mut self,
        run: &RunContext,
        ctx: &LogContext,
    ) -> Result<RunReport, PipelineError> {
        let fan_out = FanOut::new(self.settings.max_concurrent_tasks);

        self.enter(RunStage::Extracting, ctx);
        let archives = discover_archives(&self.settings.sourcedir, ctx).await?;
        let tasks = self.plan_extraction(&archives, run).await?;
        let archives_processed = tasks.len();
        let settings = Arc::clone(&self.settings);
        let extracted = fan_out
            .run(
                "extract",
                tasks,
                move |task| extract_archive(Arc::clone(&settings), task),
                ctx,
            )
            .await?;
        let mut files: Vec<ExtractedLogFile> = extracted.into_iter().flatten().collect();
        let scheduled = files.len();
        files.sort_by(|a, b| a.path().cmp(b.path()));
        files.dedup_by(|a, b| a.path() == b.path());
        if files.len() < scheduled {
            log::warn!(
                "{} DUPLICATE_FILES_DROPPED count={}",
                ctx,
                scheduled - files.len()
            );
        }
        log::info!("{} EXTRACTION_COMPLETE files={}", ctx, files.len());

        self.enter(RunStage::Converting, ctx);
        let files_converted = files.len();
        let store = Arc::clone(&self.store);
        let run_ctx = ctx.clone();
        let parsed = fan_out
            .run(
                "convert",
                files,
                move |file| convert_file(Arc::clone(&store), file, run_ctx.clone()),
                ctx,
            )
            .await?;

        self.enter(RunStage::Inserting, ctx);
        let batches: Vec<Vec<JavaLogEntry>> =
            parsed.into_iter().filter(|records| !records.is_empty()).collect();
        let store = Arc::clone(&self.store);
        let insert_ctx = ctx.clone();
        let inserted = fan_out
            .run(
                "insert",
                batches,
                move |records| insert_batch(Arc::clone(&store), records, insert_ctx.clone()),
                ctx,
            )
            .await?;
        let inserted_ids: Vec<Uuid> = inserted
            .into_iter()
            .flat_map(|result| result.inserted_ids)
            .collect();
        log::info!("{} INSERT_COMPLETE records={}", ctx, inserted_ids.len());

        self.enter(RunStage::Querying, ctx);
        let sort = self.settings.sort_spec()?;
        let records = self.store.find(&LogQuery::all(), Some(&sort)).await?;
        log::info!("{} QUERY_COMPLETE records={}", ctx, records.len());

        Ok(RunReport {
            run_id: run.run_id.clone(),
            stage: self.stage,
            archives_processed,
            files_converted,
            records_inserted: inserted_ids.len(),
            inserted_ids,
            records,
        })
    }

    /// Validate archive names and prepare output directories. Any archive
    /// whose name does not yield a node and category aborts the run.
    async fn plan_extraction(
        &self,
        archives: &[PathBuf],
        run: &RunContext,
    ) -> Result<Vec<ExtractionTask>, PipelineError> {
        let mut tasks = Vec::with_capacity(archives.len());
        for path in archives {
            let archive = ArchiveFile::from_path(path).map_err(|source| {
                PipelineError::InvalidArchiveName {
                    path: path.clone(),
                    source,
                }
            })?;
            let target = self
                .settings
                .log_dir(archive.node(), archive.log_category());
            create_log_dir(&target).await?;

            let ctx = run.archive_context(archive.name());
            log::debug!(
                "{} EXTRACTION_SCHEDULED node={} category={} target={}",
                ctx,
                archive.node(),
                archive.log_category(),
                target.display()
            );
            tasks.push(ExtractionTask {
                archive,
                target,
                ctx,
            });
        }

        if tasks.is_empty() {
            return Err(PipelineError::NoExtractionTasks);
        }
        Ok(tasks)
    }
}

/// List `.zip` files directly inside `dir`, sorted by path.
pub async fn discover_archives(dir: &Path, ctx: &LogContext) -> Result<Vec<PathBuf>, PipelineError> {
    let source_dir_error = |source: io::Error| PipelineError::SourceDir {
        dir: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(source_dir_error)?;
    let mut archives = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(source_dir_error)? {
        let path = entry.path();
        let is_file = entry
            .file_type()
            .await
            .map_err(source_dir_error)?
            .is_file();
        let is_zip = path
            .extension()
            .is_some_and(|ext| ext == ARCHIVE_EXTENSION.trim_start_matches('.'));
        if is_file && is_zip {
            archives.push(path);
        } else {
            log::debug!("{} SOURCE_ENTRY_SKIPPED path={}", ctx, path.display());
        }
    }
    archives.sort();

    if archives.is_empty() {
        log::error!("{} NO_ARCHIVES dir={}", ctx, dir.display());
        return Err(PipelineError::NoArchives {
            dir: dir.to_path_buf(),
        });
    }
    log::info!("{} ARCHIVES_DISCOVERED count={}", ctx, archives.len());
    Ok(archives)
}

/// Extract one archive in its own staging directory, then publish its files
/// into the node/category directory under names prefixed with the archive stem.
async fn extract_archive(
    settings: Arc<Settings>,
    task: ExtractionTask,
) -> Result<Vec<ExtractedLogFile>, PipelineError> {
    let ExtractionTask {
        archive,
        target,
        ctx,
    } = task;

    let staging = settings.work_dir().join(archive.id().to_string());
    let staged_dir = staging.join("extract");
    create_log_dir(&staged_dir).await?;
    let working_copy = staging.join(archive.name());
    tokio::fs::copy(archive.path(), &working_copy)
        .await
        .map_err(|source| PipelineError::WorkingCopy {
            path: archive.path().to_path_buf(),
            source,
        })?;

    let staged = extract(&working_copy, &staged_dir, &settings.member_suffix, &ctx).await?;
    let prefix = archive
        .path()
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| archive.id().to_string());
    let paths = publish_files(&staged, &target, &prefix, &ctx).await?;

    if settings.remove_working_copies {
        tokio::fs::remove_dir_all(&staging)
            .await
            .map_err(|source| PipelineError::WorkingCopy {
                path: staging.clone(),
                source,
            })?;
        log::debug!("{} WORKING_COPY_REMOVED path={}", ctx, staging.display());
    }

    let files = paths
        .iter()
        .map(|path| ExtractedLogFile::from_path(path, &archive))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(files)
}

async fn convert_file(
    store: Arc<dyn LogStore>,
    file: ExtractedLogFile,
    ctx: LogContext,
) -> Result<Vec<JavaLogEntry>, PipelineError> {
    let ctx = ctx
        .with_archive(file.source_archive().name())
        .with_file(file.name());
    Ok(parse(&file, store.as_ref(), &ctx).await?)
}

async fn insert_batch(
    store: Arc<dyn LogStore>,
    records: Vec<JavaLogEntry>,
    ctx: LogContext,
) -> Result<InsertManyResult, PipelineError> {
    let count = records.len();
    let result = store.insert_many(records).await.map_err(|err| {
        log::error!(
            "{} INSERT_FAILED count={} unavailable={} error={}",
            ctx,
            count,
            err.is_unavailable(),
            err
        );
        err
    })?;
    if result.is_empty() {
        log::warn!("{} INSERT_EMPTY_RESULT count={}", ctx, count);
    } else {
        log::debug!("{} INSERT_BATCH count={}", ctx, result.len());
    }
    Ok(result)
}
