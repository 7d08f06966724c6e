use std::path::PathBuf;

/// Destructive operations that must be confirmed by the user before any
/// backend call or local mutation happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructiveAction {
    /// Terminates every currently active job.
    StopAll,
    /// Wipes history while jobs are still active (active jobs unaffected).
    ClearHistoryWhileActive,
}

/// Blocking yes/no decision. The desktop shell renders a dialog; the CLI
/// asks on stdin; tests answer with a canned value.
pub trait ConfirmGate {
    fn confirm(&self, action: DestructiveAction) -> bool;
}

/// OS file/folder picker collaborator. `None` means the user cancelled.
pub trait PathPicker {
    fn pick_file(&self) -> Option<PathBuf>;
    fn pick_directory(&self) -> Option<PathBuf>;
}

/// Gate that answers the same way every time. The CLI uses `Assent` once
/// the user has already expressed intent (e.g. interrupt of a running
/// command); tests use both variants.
#[derive(Debug, Clone, Copy)]
pub struct Assent;

impl ConfirmGate for Assent {
    fn confirm(&self, _action: DestructiveAction) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Decline;

impl ConfirmGate for Decline {
    fn confirm(&self, _action: DestructiveAction) -> bool {
        false
    }
}
