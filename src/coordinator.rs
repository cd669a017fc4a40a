//! The work coordinator: scans the input tree, fans chapters out over a bounded
//! pool, reports progress, archives finished comics and honors cancellation.
//!
//! A run moves through `Idle → Scanning → Running → {Completed | Cancelled | Failed}`.
//! Comics are handled one after another; the chapters of one comic run
//! concurrently on a pool of `max_workers` slots shared by the whole run.
//! Results are collected in completion order, and cancellation is checked
//! before every comic and after every finished chapter.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet, spawn_blocking};

use crate::archive;
use crate::chapter::ChapterTask;
use crate::collector::Collector;
use crate::error::{Error, Result};
use crate::observer::ConversionObserver;
use crate::path_utils::path_to_string_lossy;
use crate::request::ConversionRequest;
use crate::types::{ArtifactKind, ChapterReport, Comic, RunPhase, RunStatus, RunSummary};

/// Cooperative cancellation flag of one run.
///
/// Cancelling never interrupts work that already started; it stops new
/// comics from being scheduled and drops chapters still waiting for a worker.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Task units done so far. Each chapter counts one, each comic's archive step one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// State of a single run, shared between the coordinator and its handle.
#[derive(Debug)]
pub struct RunState {
    phase: Mutex<RunPhase>,
    progress: Mutex<Progress>,
    cancel: CancelFlag,
    /// Worker slots; a permit lives as long as the blocking render holding it.
    pool: Arc<Semaphore>,
    workers: u32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RunState {
    pub fn new(max_workers: usize) -> Self {
        let workers = u32::try_from(max_workers.max(1)).unwrap_or(u32::MAX);
        Self {
            phase: Mutex::new(RunPhase::default()),
            progress: Mutex::new(Progress::default()),
            cancel: CancelFlag::new(),
            pool: Arc::new(Semaphore::new(workers as usize)),
            workers,
        }
    }

    /// Waits until no chapter render of this run is executing anymore.
    ///
    /// Cancelling drops queued chapters but lets started renders finish on
    /// their blocking threads, possibly after the coordinator has returned.
    pub async fn wait_idle(&self) -> Result<()> {
        let _all = self.pool.acquire_many(self.workers).await?;
        Ok(())
    }

    pub fn phase(&self) -> RunPhase {
        *lock(&self.phase)
    }

    pub fn progress(&self) -> Progress {
        *lock(&self.progress)
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn set_phase(&self, phase: RunPhase) {
        log::debug!("Run phase: {:?}", phase);
        *lock(&self.phase) = phase;
    }
}

#[derive(Debug, Default)]
struct Tally {
    comics_processed: usize,
    comics_skipped: usize,
}

/// Runs one conversion from scan to archives.
///
/// The coordinator owns the run state and the worker pool; chapter tasks only
/// return reports, and every observer callback is made from here.
pub struct Coordinator {
    request: ConversionRequest,
    observer: Arc<dyn ConversionObserver>,
    state: Arc<RunState>,
}

impl Coordinator {
    pub fn new(request: ConversionRequest, observer: Arc<dyn ConversionObserver>) -> Self {
        let state = Arc::new(RunState::new(request.max_workers));
        Self {
            request,
            observer,
            state,
        }
    }

    /// Flag that cancels this run when set, from any thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.state.cancel_flag()
    }

    pub fn state(&self) -> Arc<RunState> {
        Arc::clone(&self.state)
    }

    /// Executes the run to its end and reports the terminal status.
    ///
    /// Setup failures (missing input folder, output folder that cannot be
    /// created) end the run as [`RunStatus::Failed`]; they are reported through
    /// the observer and the summary rather than returned as errors.
    pub async fn run(self) -> RunSummary {
        let started_at = Utc::now();
        let mut tally = Tally::default();

        let (status, detail) = match self.execute(&mut tally).await {
            Ok(RunStatus::Completed) => {
                let progress = self.state.progress();
                self.report_progress(Progress {
                    completed: progress.total,
                    total: progress.total,
                });
                let detail = format!(
                    "All comics processed: {} converted, {} already up to date.",
                    tally.comics_processed, tally.comics_skipped
                );
                (RunStatus::Completed, detail)
            }
            Ok(status) => (status, "Conversion cancelled by user.".to_string()),
            Err(e) => {
                log::error!("Conversion failed: {}", e);
                (RunStatus::Failed, format!("Conversion failed: {}", e))
            }
        };

        self.log(&detail);
        self.state.set_phase(status.into());
        self.observer.on_finished(status, &detail);

        let progress = self.state.progress();
        RunSummary {
            status,
            detail,
            completed: progress.completed,
            total: progress.total,
            comics_processed: tally.comics_processed,
            comics_skipped: tally.comics_skipped,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn execute(&self, tally: &mut Tally) -> Result<RunStatus> {
        self.state.set_phase(RunPhase::Scanning);
        self.request.preflight_check()?;

        let output_root = &self.request.output_root;
        if !output_root.exists() {
            fs::create_dir_all(output_root).await.map_err(|e| {
                Error::Coordinator(format!(
                    "cannot create output folder {:?}: {}",
                    output_root, e
                ))
            })?;
            self.log(&format!(
                "Output folder created: {}",
                path_to_string_lossy(output_root)
            ));
        }

        self.log(&format!(
            "Scanning input folder: {}",
            path_to_string_lossy(&self.request.input_root)
        ));
        let comics = Collector::new(&self.request.input_root).scan().await?;
        let total = comics.iter().map(Comic::task_weight).sum();
        *lock(&self.state.progress) = Progress {
            completed: 0,
            total,
        };
        self.report_progress(self.state.progress());
        self.log(&format!("Found {} comic(s)", comics.len()));

        self.state.set_phase(RunPhase::Running);
        let pool = Arc::clone(&self.state.pool);

        for comic in comics {
            if self.state.is_cancelled() {
                return Ok(RunStatus::Cancelled);
            }

            let folders = self.output_folders(&comic);
            if !ChapterTask::comic_has_pending_work(&comic.chapters, &folders) {
                self.log(&format!(
                    "Comic '{}' is already up to date, skipped.",
                    comic.name
                ));
                self.advance(comic.task_weight());
                tally.comics_skipped += 1;
                continue;
            }

            if !self.process_comic(comic, &folders, &pool).await? {
                return Ok(RunStatus::Cancelled);
            }
            tally.comics_processed += 1;
        }

        Ok(RunStatus::Completed)
    }

    /// Converts all chapters of one comic and archives its output folders.
    ///
    /// Returns `false` if the run was cancelled while the comic was in progress.
    async fn process_comic(
        &self,
        comic: Comic,
        folders: &[(ArtifactKind, PathBuf)],
        pool: &Arc<Semaphore>,
    ) -> Result<bool> {
        let Comic { name, chapters, .. } = comic;
        self.log(&format!(
            "Processing comic '{}' ({} chapter(s))",
            name,
            chapters.len()
        ));

        for (_, folder) in folders {
            fs::create_dir_all(folder).await.map_err(|e| {
                Error::Coordinator(format!("cannot create folder {:?}: {}", folder, e))
            })?;
        }

        let folder_for = |kind: ArtifactKind| {
            folders
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|(_, folder)| folder.clone())
        };
        let pdf_folder = folder_for(ArtifactKind::Pdf);
        let long_folder = folder_for(ArtifactKind::LongImage);
        let settings = self.request.render_settings();

        let mut tasks: JoinSet<ChapterReport> = JoinSet::new();
        for chapter in chapters {
            let task = ChapterTask::new(chapter, pdf_folder.clone(), long_folder.clone(), settings);
            let pool = Arc::clone(pool);
            let cancel = self.state.cancel_flag();

            tasks.spawn(async move {
                let name = task.chapter_name().to_string();
                let permit = match pool.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return ChapterReport::failed(name, Error::from(e)),
                };
                if cancel.is_cancelled() {
                    return ChapterReport::cancelled(name);
                }

                spawn_blocking(move || {
                    let _permit = permit;
                    task.run()
                })
                .await
                .unwrap_or_else(|e| ChapterReport::failed(name, Error::ChapterTask(e.to_string())))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => self.log(&report.message()),
                Err(e) => self.log(&format!("Chapter task failed: {}", e)),
            }
            self.advance(1);

            if self.state.is_cancelled() {
                // queued chapters are dropped; started ones finish on their own,
                // see RunState::wait_idle
                tasks.abort_all();
                return Ok(false);
            }
        }

        for (kind, folder) in folders {
            self.archive(&name, *kind, folder).await;
        }
        self.advance(1);

        Ok(true)
    }

    /// Archives one output folder if it holds at least one file. Never fails the run.
    async fn archive(&self, comic_name: &str, kind: ArtifactKind, folder: &Path) {
        let base_name = kind.folder_name(comic_name);
        let source = folder.to_path_buf();
        self.log(&format!("Archiving {} folder of '{}'", kind.label(), comic_name));

        let result = spawn_blocking(move || -> Result<Option<PathBuf>> {
            if archive::archive_members(&source)?.is_empty() {
                return Ok(None);
            }
            archive::archive_folder(&source, &base_name).map(Some)
        })
        .await;

        match result {
            Ok(Ok(Some(zip_path))) => {
                self.log(&format!("Archive saved: {}", path_to_string_lossy(&zip_path)))
            }
            Ok(Ok(None)) => self.log(&format!(
                "No {} files for '{}', nothing to archive.",
                kind.label(),
                comic_name
            )),
            Ok(Err(e)) => self.log(&format!("Archive failed: {}", e)),
            Err(e) => self.log(&format!("Archive task failed: {}", e)),
        }
    }

    fn output_folders(&self, comic: &Comic) -> Vec<(ArtifactKind, PathBuf)> {
        self.request
            .requested_kinds()
            .into_iter()
            .map(|kind| (kind, comic.output_folder(kind, &self.request.output_root)))
            .collect()
    }

    fn advance(&self, units: usize) {
        let progress = {
            let mut progress = lock(&self.state.progress);
            progress.completed = (progress.completed + units).min(progress.total);
            *progress
        };
        self.report_progress(progress);
    }

    fn report_progress(&self, progress: Progress) {
        self.observer
            .on_progress(progress.completed, progress.total);
    }

    fn log(&self, line: &str) {
        self.observer.on_log(line);
    }
}

/// Handle to a run spawned onto the tokio runtime.
#[derive(Debug)]
pub struct RunHandle {
    state: Arc<RunState>,
    join: JoinHandle<RunSummary>,
}

impl RunHandle {
    /// Spawns a coordinator for `request`. Must be called from within a tokio runtime.
    pub fn spawn(request: ConversionRequest, observer: Arc<dyn ConversionObserver>) -> Self {
        let coordinator = Coordinator::new(request, observer);
        let state = coordinator.state();
        let join = tokio::spawn(coordinator.run());
        Self { state, join }
    }

    pub fn cancel(&self) {
        self.state.cancel_flag().cancel();
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.state.cancel_flag()
    }

    pub fn state(&self) -> Arc<RunState> {
        Arc::clone(&self.state)
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the run to end, including renders still finishing after a cancel.
    pub async fn wait(self) -> Result<RunSummary> {
        let summary = self.join.await?;
        self.state.wait_idle().await?;
        Ok(summary)
    }
}

/// Front door for a UI: at most one run at a time.
///
/// Starting a new run first cancels the active one and waits for it to end.
#[derive(Debug, Default)]
pub struct Converter {
    active: Option<RunHandle>,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a run, stopping any run still active.
    ///
    /// The new run is spawned only after every render of the previous one has
    /// finished, so two runs never write the same file.
    ///
    /// # Returns
    ///
    /// * `Option<RunSummary>` - Summary of the previous run, if there was one
    pub async fn start(
        &mut self,
        request: ConversionRequest,
        observer: Arc<dyn ConversionObserver>,
    ) -> Option<RunSummary> {
        let previous = match self.active.take() {
            Some(handle) => {
                handle.cancel();
                handle.wait().await.ok()
            }
            None => None,
        };
        self.active = Some(RunHandle::spawn(request, observer));
        previous
    }

    pub fn cancel(&self) {
        if let Some(handle) = &self.active {
            handle.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    pub fn state(&self) -> Option<Arc<RunState>> {
        self.active.as_ref().map(RunHandle::state)
    }

    /// Waits for the active run, if any, and returns its summary.
    pub async fn wait(&mut self) -> Option<Result<RunSummary>> {
        match self.active.take() {
            Some(handle) => Some(handle.wait().await),
            None => None,
        }
    }
}
