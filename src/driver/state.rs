//! Engine lifecycle state as reported to the polling caller.

/// Result of [`FeedEngine::poll`](crate::FeedEngine::poll)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FeedState {
    /// No transfer in progress; the last one (if any) completed cleanly
    #[default]
    Idle,
    /// A transfer is in progress
    Busy,
    /// The last transfer ended on a hardware error and the DMA was reset.
    /// Reported once; later polls report `Idle`.
    IdleError,
}

impl FeedState {
    /// Check if the engine can accept a new transfer
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, FeedState::Idle | FeedState::IdleError)
    }

    /// Short name for diagnostics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FeedState::Idle => "idle",
            FeedState::Busy => "busy",
            FeedState::IdleError => "idle (error)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_states() {
        assert!(FeedState::Idle.is_idle());
        assert!(FeedState::IdleError.is_idle());
        assert!(!FeedState::Busy.is_idle());
        assert_eq!(FeedState::default(), FeedState::Idle);
    }
}
