use std::sync::{Arc, Mutex, MutexGuard};

use crate::jobs::{Job, JobKind};

/// In-memory collection of known jobs, keyed by id, in arrival order.
///
/// Exactly one entry per id exists at any time: merges overwrite fields in
/// place and never create a second entry for an id already present. The
/// registry is a cache of the backend's view; durable history is the
/// backend's responsibility.
#[derive(Debug, Default, Clone)]
pub struct JobRegistry {
    jobs: Vec<Job>,
}

/// Active jobs first, then history, each in registry order. A strict
/// cover: every job appears in exactly one of the two, determined solely
/// by its status.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Partition {
    pub active: Vec<Job>,
    pub history: Vec<Job>,
}

impl JobRegistry {
    pub fn new() -> JobRegistry {
        JobRegistry::default()
    }

    /// Insert or overwrite by id. An optimistic placeholder is replaced
    /// wholesale once the first authoritative snapshot carrying its id
    /// arrives.
    pub fn upsert(&mut self, job: Job) {
        match self.jobs.iter_mut().find(|j| j.id == job.id) {
            Some(existing) => *existing = job,
            None => self.jobs.push(job),
        }
    }

    /// Merge an authoritative snapshot: the snapshot fully replaces the
    /// known id set for `kind`. Jobs of the kind absent from the snapshot
    /// are pruned; duplicate ids within one snapshot collapse to a single
    /// entry with the later occurrence winning. Jobs of the other kind are
    /// untouched.
    pub fn apply_snapshot(&mut self, kind: JobKind, snapshot: Vec<Job>) {
        self.jobs.retain(|j| j.kind != kind);
        for job in snapshot {
            if job.kind != kind {
                continue;
            }
            self.upsert(job);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Job> {
        let index = self.jobs.iter().position(|j| j.id == id)?;
        Some(self.jobs.remove(index))
    }

    /// Remove every job matching the predicate; returns how many were
    /// removed.
    pub fn remove_all<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Job) -> bool,
    {
        let before = self.jobs.len();
        self.jobs.retain(|j| !predicate(j));
        before - self.jobs.len()
    }

    pub fn jobs_of(&self, kind: JobKind) -> Vec<Job> {
        self.jobs.iter().filter(|j| j.kind == kind).cloned().collect()
    }

    pub fn partition(&self) -> Partition {
        Partition {
            active: self.jobs.iter().filter(|j| j.status.is_active()).cloned().collect(),
            history: self.jobs.iter().filter(|j| j.status.is_terminal()).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Registry handle shared between the poller, the orchestrator and
/// read-only display consumers. Constructed explicitly by the orchestration
/// layer and passed around; there is no ambient global instance.
#[derive(Debug, Default, Clone)]
pub struct SharedRegistry {
    inner: Arc<Mutex<JobRegistry>>,
}

impl SharedRegistry {
    pub fn new() -> SharedRegistry {
        SharedRegistry::default()
    }

    /// Short-lived lock; never held across an await.
    pub fn lock(&self) -> MutexGuard<'_, JobRegistry> {
        self.inner.lock().expect("job registry lock poisoned")
    }

    /// Owned snapshot of the current partition for rendering.
    pub fn partition(&self) -> Partition {
        self.lock().partition()
    }
}
