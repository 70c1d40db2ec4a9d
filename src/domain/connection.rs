/// Lifecycle of the live channel for one group view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    /// True while a connection attempt or live connection exists.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Self::Idle => "CONNECTION_IDLE",
            Self::Connecting => "CONNECTION_CONNECTING",
            Self::Open => "CONNECTION_OPEN",
            Self::Closed => "CONNECTION_CLOSED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_open_state_is_open() {
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Connecting.is_open());
        assert!(!ConnectionState::Closed.is_open());
        assert!(!ConnectionState::Idle.is_open());
    }

    #[test]
    fn connecting_and_open_are_active() {
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Open.is_active());
        assert!(!ConnectionState::Closed.is_active());
        assert!(!ConnectionState::Idle.is_active());
    }

    #[test]
    fn labels_are_stable_codes() {
        assert_eq!(ConnectionState::Open.as_label(), "CONNECTION_OPEN");
        assert_eq!(ConnectionState::Closed.as_label(), "CONNECTION_CLOSED");
    }
}
