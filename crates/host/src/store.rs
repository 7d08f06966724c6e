use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::watch;

use mediamux_engine::jobs::{Job, JobKind, JobStatus};

/// Authoritative in-memory job table. Snapshots of this table are what the
/// engine's poller reconciles against; rows live for the process lifetime
/// until history is cleared.
#[derive(Default)]
pub struct JobTable {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    // Creation order; snapshot order follows it.
    jobs: Vec<Job>,
    stops: HashMap<String, watch::Sender<bool>>,
}

impl JobTable {
    pub fn new() -> JobTable {
        JobTable::default()
    }

    /// Register a fresh job and hand back the stop signal its runner
    /// watches.
    pub fn insert(&self, job: Job) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        let mut inner = self.lock();
        inner.stops.insert(job.id.clone(), tx);
        inner.jobs.push(job);
        rx
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.lock().jobs.iter().find(|j| j.id == id).cloned()
    }

    pub fn set_running(&self, id: &str) {
        let mut inner = self.lock();
        if let Some(job) = inner.jobs.iter_mut().find(|j| j.id == id) {
            if job.status == JobStatus::Queued {
                job.status = JobStatus::Running;
            }
        }
    }

    /// Progress only moves forward and only while the job is active; late
    /// writes from a runner that lost the stop race are dropped.
    pub fn set_progress(&self, id: &str, percent: u8, speed: Option<String>, eta: Option<String>) {
        let mut inner = self.lock();
        if let Some(job) = inner.jobs.iter_mut().find(|j| j.id == id) {
            if !job.status.is_active() {
                return;
            }
            if percent >= job.progress {
                job.progress = percent.min(100);
            }
            if speed.is_some() {
                job.speed = speed;
            }
            if eta.is_some() {
                job.eta = eta;
            }
        }
    }

    /// Terminal transition from a finished runner. A job already marked
    /// Stopped keeps that status.
    pub fn finish(&self, id: &str, result: Result<(), String>) {
        let mut inner = self.lock();
        if let Some(job) = inner.jobs.iter_mut().find(|j| j.id == id) {
            if job.status.is_active() {
                match result {
                    Ok(()) => {
                        job.status = JobStatus::Completed;
                        job.progress = 100;
                        job.speed = None;
                        job.eta = None;
                    }
                    Err(message) => {
                        job.status = JobStatus::Errored;
                        job.error = Some(message);
                        job.speed = None;
                        job.eta = None;
                    }
                }
                job.completed_at = Some(Utc::now());
            }
        }
        inner.stops.remove(id);
    }

    pub fn mark_stopped(&self, id: &str) {
        let mut inner = self.lock();
        if let Some(job) = inner.jobs.iter_mut().find(|j| j.id == id) {
            if job.status.is_active() {
                job.status = JobStatus::Stopped;
                job.speed = None;
                job.eta = None;
                job.completed_at = Some(Utc::now());
            }
        }
        inner.stops.remove(id);
    }

    /// Signal one runner to stop. Returns false when the id is unknown.
    pub fn signal_stop(&self, id: &str) -> bool {
        let inner = self.lock();
        match inner.stops.get(id) {
            Some(tx) => {
                let _ = tx.send(true);
                true
            }
            None => inner.jobs.iter().any(|j| j.id == id),
        }
    }

    /// Signal every active runner of a kind; returns how many were
    /// signalled.
    pub fn signal_stop_all(&self, kind: JobKind) -> usize {
        let inner = self.lock();
        let mut signalled = 0;
        for job in inner.jobs.iter().filter(|j| j.kind == kind && j.status.is_active()) {
            if let Some(tx) = inner.stops.get(&job.id) {
                let _ = tx.send(true);
                signalled += 1;
            }
        }
        signalled
    }

    /// Authoritative snapshot for one kind, in creation order.
    pub fn snapshot(&self, kind: JobKind) -> Vec<Job> {
        self.lock().jobs.iter().filter(|j| j.kind == kind).cloned().collect()
    }

    /// Drop terminal rows of a kind; active jobs are unaffected.
    pub fn clear_history(&self, kind: JobKind) -> usize {
        let mut inner = self.lock();
        let before = inner.jobs.len();
        inner.jobs.retain(|j| !(j.kind == kind && j.status.is_terminal()));
        let removed = before - inner.jobs.len();
        let keep: std::collections::HashSet<String> =
            inner.jobs.iter().map(|j| j.id.clone()).collect();
        inner.stops.retain(|id, _| keep.contains(id));
        removed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("job table lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediamux_engine::catalog::Quality;
    use mediamux_engine::jobs::{AudioParams, ConvertSpec, DownloadSpec, ResolvedSpec};
    use std::path::PathBuf;

    fn convert_job(id: &str) -> Job {
        Job::queued(
            id.to_string(),
            ResolvedSpec::Convert(ConvertSpec {
                input: PathBuf::from("/media/in.mkv"),
                output_dir: PathBuf::from("/out"),
                container: "mp4".to_string(),
                quality: Quality::High,
                video: None,
                audio: AudioParams {
                    codec: "aac".to_string(),
                    engine: "aac".to_string(),
                    bitrate: "320k".to_string(),
                    sample_rate: "48000".to_string(),
                    channels: "2".to_string(),
                },
            }),
        )
    }

    fn download_job(id: &str) -> Job {
        Job::queued(
            id.to_string(),
            ResolvedSpec::Download(DownloadSpec {
                url: "https://example.com/v".to_string(),
                output_dir: PathBuf::from("/out"),
                format_id: "137".to_string(),
                container: "mp4".to_string(),
                audio_quality: "192".to_string(),
                video_quality: "1080".to_string(),
            }),
        )
    }

    #[test]
    fn snapshot_preserves_creation_order_and_kind() {
        let table = JobTable::new();
        table.insert(convert_job("c-1"));
        table.insert(download_job("d-1"));
        table.insert(convert_job("c-2"));

        let ids: Vec<_> = table.snapshot(JobKind::Convert).into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec!["c-1", "c-2"]);
        assert_eq!(table.snapshot(JobKind::Download).len(), 1);
    }

    #[test]
    fn progress_never_regresses_and_stops_after_terminal() {
        let table = JobTable::new();
        table.insert(convert_job("c-1"));
        table.set_running("c-1");

        table.set_progress("c-1", 40, Some("1.2x".to_string()), None);
        table.set_progress("c-1", 30, None, None);
        assert_eq!(table.get("c-1").unwrap().progress, 40);

        table.mark_stopped("c-1");
        table.set_progress("c-1", 90, None, None);
        let job = table.get("c-1").unwrap();
        assert_eq!(job.status, JobStatus::Stopped);
        assert_eq!(job.progress, 40);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn finish_after_stop_keeps_stopped_status() {
        let table = JobTable::new();
        table.insert(convert_job("c-1"));
        table.set_running("c-1");
        table.mark_stopped("c-1");

        table.finish("c-1", Ok(()));
        assert_eq!(table.get("c-1").unwrap().status, JobStatus::Stopped);

        table.finish("c-1", Err("late failure".to_string()));
        assert_eq!(table.get("c-1").unwrap().status, JobStatus::Stopped);
        assert!(table.get("c-1").unwrap().error.is_none());
    }

    #[test]
    fn finish_records_outcome() {
        let table = JobTable::new();
        table.insert(convert_job("ok"));
        table.insert(convert_job("bad"));
        table.set_running("ok");
        table.set_running("bad");

        table.finish("ok", Ok(()));
        table.finish("bad", Err("boom".to_string()));

        let ok = table.get("ok").unwrap();
        assert_eq!(ok.status, JobStatus::Completed);
        assert_eq!(ok.progress, 100);

        let bad = table.get("bad").unwrap();
        assert_eq!(bad.status, JobStatus::Errored);
        assert_eq!(bad.error.as_deref(), Some("boom"));
    }

    #[test]
    fn clear_history_drops_only_terminal_rows_of_kind() {
        let table = JobTable::new();
        table.insert(convert_job("active"));
        table.insert(convert_job("done"));
        table.insert(download_job("d-done"));
        table.set_running("active");
        table.set_running("done");
        table.finish("done", Ok(()));
        table.set_running("d-done");
        table.finish("d-done", Ok(()));

        let removed = table.clear_history(JobKind::Convert);
        assert_eq!(removed, 1);
        assert!(table.get("active").is_some());
        assert!(table.get("done").is_none());
        assert!(table.get("d-done").is_some());
    }

    #[test]
    fn signal_stop_reports_unknown_ids() {
        let table = JobTable::new();
        let mut rx = table.insert(convert_job("c-1"));

        assert!(!table.signal_stop("nope"));
        assert!(table.signal_stop("c-1"));
        assert!(*rx.borrow_and_update());
    }

    #[test]
    fn signal_stop_all_only_hits_active_jobs_of_kind() {
        let table = JobTable::new();
        table.insert(convert_job("c-1"));
        table.insert(convert_job("c-2"));
        table.insert(download_job("d-1"));
        table.set_running("c-1");
        table.set_running("c-2");
        table.finish("c-2", Ok(()));

        assert_eq!(table.signal_stop_all(JobKind::Convert), 1);
    }

    use proptest::prelude::*;

    proptest! {
        /// For any interleaving of lifecycle operations, snapshots stay
        /// free of duplicate ids, terminal rows carry a completion time,
        /// and clearing history leaves only active rows behind.
        #[test]
        fn prop_table_invariants_hold_under_any_op_sequence(
            ops in prop::collection::vec((0u8..4, 0u8..4), 0..40),
        ) {
            let table = JobTable::new();
            for (slot, op) in ops {
                let id = format!("c-{}", slot);
                match op {
                    0 => {
                        if table.get(&id).is_none() {
                            table.insert(convert_job(&id));
                        }
                    }
                    1 => table.set_running(&id),
                    2 => table.finish(&id, Ok(())),
                    _ => table.mark_stopped(&id),
                }
            }

            let snapshot = table.snapshot(JobKind::Convert);
            let mut seen = std::collections::HashSet::new();
            for job in &snapshot {
                prop_assert!(seen.insert(job.id.clone()), "duplicate id {}", job.id);
                if job.status.is_terminal() {
                    prop_assert!(job.completed_at.is_some());
                }
            }

            table.clear_history(JobKind::Convert);
            for job in table.snapshot(JobKind::Convert) {
                prop_assert!(job.status.is_active());
            }
        }
    }
}
