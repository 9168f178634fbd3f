use tracing::{debug, info, warn};

use super::FileStamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendReason {
    /// A change was seen and the user has not answered the rescan question.
    AwaitingConfirmation,
    /// The save is being backed up and rewritten by us.
    Mutating,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    /// No save path yet.
    Idle,
    Armed,
    Suspended(SuspendReason),
    /// The watcher failed; rescans have to be requested by hand.
    Disabled { reason: String },
}

/// What the owner should do with a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDecision {
    Ignore,
    AskToRescan,
}

/// Gatekeeper between file change notifications and rescans.
///
/// Only the session owner calls into it, one event at a time.
#[derive(Debug)]
pub struct WatchCoordinator {
    state: WatchState,
    /// Stamp of the file as we last read or wrote it.
    known: Option<FileStamp>,
    /// State to return to when the running mutation finishes.
    resume: Option<WatchState>,
}

impl Default for WatchCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchCoordinator {
    pub fn new() -> Self {
        Self {
            state: WatchState::Idle,
            known: None,
            resume: None,
        }
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == WatchState::Armed
    }

    pub fn is_mutating(&self) -> bool {
        self.state == WatchState::Suspended(SuspendReason::Mutating)
    }

    pub fn awaiting_confirmation(&self) -> bool {
        self.state == WatchState::Suspended(SuspendReason::AwaitingConfirmation)
    }

    /// Start watching a newly established save path.
    pub fn arm(&mut self) {
        self.state = WatchState::Armed;
        self.known = None;
    }

    /// Remember what the file looked like after a scan. Later notifications
    /// for an identical stamp, such as access-time updates, are not changes.
    pub fn record(&mut self, stamp: Option<FileStamp>) {
        if stamp.is_some() {
            self.known = stamp;
        }
    }

    pub fn on_change(&mut self, stamp: FileStamp) -> ChangeDecision {
        if self.state != WatchState::Armed {
            debug!(state = ?self.state, "change_ignored_not_armed");
            return ChangeDecision::Ignore;
        }
        if self.known == Some(stamp) {
            debug!("change_ignored_known_stamp");
            return ChangeDecision::Ignore;
        }
        self.state = WatchState::Suspended(SuspendReason::AwaitingConfirmation);
        ChangeDecision::AskToRescan
    }

    /// Resolve a pending rescan question. Returns whether to rescan.
    ///
    /// The coordinator is armed again whatever the answer.
    pub fn on_confirmation(&mut self, rescan: bool) -> bool {
        if !self.awaiting_confirmation() {
            return false;
        }
        self.state = WatchState::Armed;
        rescan
    }

    /// Enter the mutation window. Fails while another mutation runs or a
    /// rescan question is pending.
    pub fn begin_mutation(&mut self) -> bool {
        if matches!(self.state, WatchState::Suspended(_)) {
            return false;
        }
        let previous = std::mem::replace(
            &mut self.state,
            WatchState::Suspended(SuspendReason::Mutating),
        );
        self.resume = Some(previous);
        true
    }

    /// Leave the mutation window, remembering what our write looked like.
    pub fn finish_mutation(&mut self, written: Option<FileStamp>) {
        if !self.is_mutating() {
            warn!(state = ?self.state, "finish_mutation_without_begin");
            return;
        }
        self.record(written);
        self.state = self.resume.take().unwrap_or(WatchState::Armed);
    }

    pub fn disable(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        info!(%reason, "watch_disabled");
        self.state = WatchState::Disabled { reason };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn stamp(secs: u64, len: u64) -> FileStamp {
        FileStamp {
            modified: Some(UNIX_EPOCH + Duration::from_secs(secs)),
            len,
        }
    }

    #[test]
    fn test_idle_ignores_changes() {
        let mut watch = WatchCoordinator::new();
        assert_eq!(watch.on_change(stamp(1, 1)), ChangeDecision::Ignore);
        assert_eq!(watch.state(), &WatchState::Idle);
    }

    #[test]
    fn test_change_asks_once_then_rearms() {
        let mut watch = WatchCoordinator::new();
        watch.arm();

        assert_eq!(watch.on_change(stamp(1, 10)), ChangeDecision::AskToRescan);
        assert!(watch.awaiting_confirmation());
        assert_eq!(watch.on_change(stamp(2, 10)), ChangeDecision::Ignore);

        assert!(watch.on_confirmation(true));
        assert!(watch.is_armed());

        assert_eq!(watch.on_change(stamp(3, 10)), ChangeDecision::AskToRescan);
        assert!(!watch.on_confirmation(false));
        assert!(watch.is_armed());
    }

    #[test]
    fn test_stray_confirmation_is_ignored() {
        let mut watch = WatchCoordinator::new();
        watch.arm();
        assert!(!watch.on_confirmation(true));
        assert!(watch.is_armed());
    }

    #[test]
    fn test_mutation_suspends_and_hides_own_write() {
        let mut watch = WatchCoordinator::new();
        watch.arm();

        assert!(watch.begin_mutation());
        assert!(watch.is_mutating());
        assert!(!watch.begin_mutation());
        assert_eq!(watch.on_change(stamp(5, 20)), ChangeDecision::Ignore);

        watch.finish_mutation(Some(stamp(5, 20)));
        assert!(watch.is_armed());
        assert_eq!(watch.on_change(stamp(5, 20)), ChangeDecision::Ignore);
        assert_eq!(watch.on_change(stamp(6, 20)), ChangeDecision::AskToRescan);
    }

    #[test]
    fn test_recorded_scan_stamp_is_not_a_change() {
        let mut watch = WatchCoordinator::new();
        watch.arm();
        watch.record(Some(stamp(4, 12)));
        assert_eq!(watch.on_change(stamp(4, 12)), ChangeDecision::Ignore);

        watch.record(None);
        assert_eq!(watch.on_change(stamp(4, 12)), ChangeDecision::Ignore);
        assert_eq!(watch.on_change(stamp(4, 13)), ChangeDecision::AskToRescan);
    }

    #[test]
    fn test_failed_mutation_still_rearms() {
        let mut watch = WatchCoordinator::new();
        watch.arm();
        assert!(watch.begin_mutation());
        watch.finish_mutation(None);
        assert!(watch.is_armed());
    }

    #[test]
    fn test_mutation_keeps_disabled_watch_disabled() {
        let mut watch = WatchCoordinator::new();
        watch.arm();
        watch.disable("gone");
        assert!(watch.begin_mutation());
        watch.finish_mutation(Some(stamp(1, 1)));
        assert!(matches!(watch.state(), WatchState::Disabled { .. }));
    }

    #[test]
    fn test_no_mutation_while_question_pending() {
        let mut watch = WatchCoordinator::new();
        watch.arm();
        watch.on_change(stamp(1, 1));
        assert!(!watch.begin_mutation());
        assert!(watch.awaiting_confirmation());
    }

    #[test]
    fn test_disabled_until_rearmed() {
        let mut watch = WatchCoordinator::new();
        watch.arm();
        watch.disable("metadata unavailable");
        assert_eq!(watch.on_change(stamp(1, 1)), ChangeDecision::Ignore);
        assert!(matches!(watch.state(), WatchState::Disabled { .. }));

        watch.arm();
        assert_eq!(watch.on_change(stamp(1, 1)), ChangeDecision::AskToRescan);
    }
}
