use crate::record::LifecycleStatus;

/// Status-guarded lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Start,
    Pause,
    Continue,
    Stop,
    Kill,
    Restart,
    Top,
    Remove,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Start => "start",
            Operation::Pause => "pause",
            Operation::Continue => "continue",
            Operation::Stop => "stop",
            Operation::Kill => "kill",
            Operation::Restart => "restart",
            Operation::Top => "top",
            Operation::Remove => "remove",
        }
    }

    /// Whether the operation may run from `status`.
    pub fn permits(self, status: LifecycleStatus) -> bool {
        use LifecycleStatus::*;
        match self {
            Operation::Start => !matches!(status, Start | Unknown),
            Operation::Pause => status == Start,
            Operation::Continue => status == Pause,
            Operation::Stop => matches!(status, Start | Pause),
            Operation::Kill => true,
            Operation::Restart => !matches!(status, Created | Unknown),
            Operation::Top => status == Start,
            Operation::Remove => !status.is_active(),
        }
    }

    /// Status recorded after a successful runtime call; `None` leaves the
    /// record as it is (top) or deletes it (remove).
    pub fn outcome(self) -> Option<LifecycleStatus> {
        match self {
            Operation::Start | Operation::Continue | Operation::Restart => {
                Some(LifecycleStatus::Start)
            }
            Operation::Pause => Some(LifecycleStatus::Pause),
            Operation::Stop | Operation::Kill => Some(LifecycleStatus::Stop),
            Operation::Top | Operation::Remove => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleStatus::*;

    #[test]
    fn test_pause_and_continue_are_strict() {
        for status in LifecycleStatus::all() {
            assert_eq!(Operation::Pause.permits(*status), *status == Start);
            assert_eq!(Operation::Continue.permits(*status), *status == Pause);
        }
    }

    #[test]
    fn test_unknown_is_non_actionable() {
        assert!(!Operation::Start.permits(Unknown));
        assert!(!Operation::Restart.permits(Unknown));
        assert!(!Operation::Stop.permits(Unknown));
        assert!(Operation::Kill.permits(Unknown));
        assert!(Operation::Remove.permits(Unknown));
    }

    #[test]
    fn test_start_and_restart_guards() {
        assert!(!Operation::Start.permits(Start));
        assert!(Operation::Start.permits(Stop));
        assert!(Operation::Start.permits(Created));
        assert!(!Operation::Restart.permits(Created));
        assert!(Operation::Restart.permits(Dead));
    }

    #[test]
    fn test_remove_refused_while_active() {
        assert!(!Operation::Remove.permits(Start));
        assert!(!Operation::Remove.permits(Pause));
        assert!(Operation::Remove.permits(Stop));
        assert!(Operation::Remove.permits(Created));
    }
}
