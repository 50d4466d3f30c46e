/// The engine-path replace-in-place state machine. Each transition has a
/// compensating action on failure; only `DependentsRecreated` and
/// `Success` run unlocked (the lock is held through dependent recreation
/// since a crash mid-recreation must still block a concurrent retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Locked,
    ConfigExtracted,
    OldStopped,
    OldRemoved,
    NewCreated,
    NewRunning,
    DependentsRecreated,
    Success,
}

/// Terminal outcome reported to the caller, distinct from `UpdateState`
/// (the state machine tracks progress, this is what gets surfaced).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Success { message: String },
    AlreadyUpToDate,
    Blocked(String),
    InProgress,
}
