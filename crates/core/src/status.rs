//! Submission lifecycle status.
//!
//! The variant discriminants match the seed data order (1-based) in the
//! `submission_statuses` lookup table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

/// Submission processing status.
///
/// The happy path is `Pending -> Claimed -> Converting -> Verifying ->
/// Completed`. `Completed` and `Failed` are terminal; nothing leaves a
/// terminal state. A processing submission may return to `Pending` only
/// through lease-expiry redelivery after a worker crash.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Pending = 1,
    Claimed = 2,
    Converting = 3,
    Verifying = 4,
    Completed = 5,
    Failed = 6,
}

impl SubmissionStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Look up a status by its database ID.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Pending),
            2 => Some(Self::Claimed),
            3 => Some(Self::Converting),
            4 => Some(Self::Verifying),
            5 => Some(Self::Completed),
            6 => Some(Self::Failed),
            _ => None,
        }
    }

    /// Lowercase wire name, as stored in the lookup table and returned
    /// by the status endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Converting => "converting",
            Self::Verifying => "verifying",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether this status is terminal. No transition leaves a terminal
    /// state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a worker currently holds (or held) a claim in this status.
    pub fn is_processing(self) -> bool {
        matches!(self, Self::Claimed | Self::Converting | Self::Verifying)
    }

    /// Whether `self -> to` is an allowed edge of the state machine.
    ///
    /// The `Claimed`/`Converting`/`Verifying` -> `Pending` edges exist
    /// solely for lease-expiry redelivery; stores must take them only
    /// from the expiry sweep, never on external request.
    pub fn can_transition_to(self, to: Self) -> bool {
        use SubmissionStatus::*;
        match (self, to) {
            (Pending, Claimed) => true,
            (Claimed, Converting) => true,
            (Converting, Verifying) => true,
            // A submission rejected before verification (guardrail) or
            // failed mid-stage terminates early.
            (Converting, Completed) | (Converting, Failed) => true,
            (Verifying, Completed) | (Verifying, Failed) => true,
            // Crash-recovery redelivery.
            (Claimed, Pending) | (Converting, Pending) | (Verifying, Pending) => true,
            _ => false,
        }
    }
}

impl From<SubmissionStatus> for StatusId {
    fn from(value: SubmissionStatus) -> Self {
        value as StatusId
    }
}
