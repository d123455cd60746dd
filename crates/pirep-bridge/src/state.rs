//! Flight report lifecycle state machine.
//!
//! The [`StateMachine`] is the single source of truth for which lifecycle
//! actions are currently legal for the tracked report. States mirror the
//! phpVMS `PirepState` codes, so they can be compared directly with the
//! `state` field the server returns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Lifecycle state of a flight report.
///
/// The discriminants match the numeric codes used by the phpVMS API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ReportState {
    /// The flight is underway and accepting updates.
    #[default]
    InProgress = 0,
    /// Filed and awaiting review.
    Pending = 1,
    /// Accepted by the airline.
    Accepted = 2,
    /// Cancelled by the pilot.
    Cancelled = 3,
    /// Deleted on the server.
    Deleted = 4,
    /// Saved as a draft.
    Draft = 5,
    /// Rejected by the airline.
    Rejected = 6,
    /// Paused by the pilot.
    Paused = 7,
}

impl ReportState {
    /// Every state, in code order.
    pub const ALL: [Self; 8] = [
        Self::InProgress,
        Self::Pending,
        Self::Accepted,
        Self::Cancelled,
        Self::Deleted,
        Self::Draft,
        Self::Rejected,
        Self::Paused,
    ];

    /// True for states that accept no further mutation.
    #[must_use]
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::Rejected | Self::Cancelled | Self::Deleted
        )
    }

    /// True when telemetry updates may be applied.
    #[must_use]
    pub fn can_update(self) -> bool {
        !self.is_read_only()
    }

    /// True when the report may be submitted for review.
    #[must_use]
    pub fn can_file(self) -> bool {
        matches!(self, Self::InProgress | Self::Draft | Self::Paused)
    }

    /// True when the report may be cancelled.
    #[must_use]
    pub fn can_cancel(self) -> bool {
        !matches!(
            self,
            Self::Accepted | Self::Rejected | Self::Cancelled | Self::Deleted
        )
    }

    /// The numeric phpVMS code.
    #[must_use]
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl fmt::Display for ReportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Cancelled => "CANCELLED",
            Self::Deleted => "DELETED",
            Self::Draft => "DRAFT",
            Self::Rejected => "REJECTED",
            Self::Paused => "PAUSED",
        };
        f.write_str(name)
    }
}

impl TryFrom<i64> for ReportState {
    type Error = String;

    fn try_from(code: i64) -> std::result::Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| format!("unknown PIREP state code {code}"))
    }
}

impl From<ReportState> for i64 {
    fn from(state: ReportState) -> Self {
        state.code()
    }
}

/// Flight phase reported by the simulator plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightPhase {
    /// `INI`
    Initiated,
    /// `BST`
    Boarding,
    /// `TXI`
    Taxiing,
    /// `TOF`
    TakeOff,
    /// `TKO`
    TakeOffClimb,
    /// `ENR`
    EnRoute,
    /// `TEN`
    TopOfDescent,
    /// `LDG`
    Landing,
    /// `LAN`
    Landed,
    /// `ARR`
    Arrived,
    /// `DX`
    Deboarding,
    /// `PSD`
    PostShutdown,
}

impl FlightPhase {
    /// Every phase, in flight order.
    pub const ALL: [Self; 12] = [
        Self::Initiated,
        Self::Boarding,
        Self::Taxiing,
        Self::TakeOff,
        Self::TakeOffClimb,
        Self::EnRoute,
        Self::TopOfDescent,
        Self::Landing,
        Self::Landed,
        Self::Arrived,
        Self::Deboarding,
        Self::PostShutdown,
    ];

    /// The wire code for this phase.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Initiated => "INI",
            Self::Boarding => "BST",
            Self::Taxiing => "TXI",
            Self::TakeOff => "TOF",
            Self::TakeOffClimb => "TKO",
            Self::EnRoute => "ENR",
            Self::TopOfDescent => "TEN",
            Self::Landing => "LDG",
            Self::Landed => "LAN",
            Self::Arrived => "ARR",
            Self::Deboarding => "DX",
            Self::PostShutdown => "PSD",
        }
    }
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for FlightPhase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.code() == s)
            .ok_or_else(|| Error::InvalidStatus(s.to_string()))
    }
}

/// Tracks the lifecycle state of the single active report.
///
/// Transitions are explicit. Guarded transitions fail with
/// [`Error::PreconditionFailed`] naming the current state and leave the
/// state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateMachine {
    current: ReportState,
}

impl StateMachine {
    /// Create a machine in the initial `InProgress` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state.
    #[must_use]
    pub fn current(&self) -> ReportState {
        self.current
    }

    /// A new report was created on the server.
    pub fn prefile(&mut self) {
        self.transition(ReportState::InProgress, "prefile");
    }

    /// Submit the report for review.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` unless the current state can be filed.
    pub fn file(&mut self) -> Result<()> {
        if !self.current.can_file() {
            return Err(Error::precondition("filed", self.current));
        }
        self.transition(ReportState::Pending, "file");
        Ok(())
    }

    /// Cancel the report.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` unless the current state can be cancelled.
    pub fn cancel(&mut self) -> Result<()> {
        if !self.current.can_cancel() {
            return Err(Error::precondition("cancelled", self.current));
        }
        self.transition(ReportState::Cancelled, "cancel");
        Ok(())
    }

    /// Abandon locally. Always succeeds.
    pub fn reset(&mut self) {
        self.transition(ReportState::InProgress, "reset");
    }

    /// Adopt a report fetched from the server, forcing `InProgress`
    /// regardless of the prior local state.
    pub fn adopt(&mut self) {
        self.transition(ReportState::InProgress, "adopt");
    }

    /// Record a state reported by the server's own workflow.
    pub fn observe(&mut self, state: ReportState) {
        self.transition(state, "observe");
    }

    /// Check that a telemetry update may be applied. Never changes state.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` if the current state is read-only.
    pub fn check_update(&self) -> Result<()> {
        if self.current.can_update() {
            Ok(())
        } else {
            Err(Error::ReadOnly {
                state: self.current,
            })
        }
    }

    /// Check that the report may be filed without changing state.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` unless the current state can be filed.
    pub fn check_file(&self) -> Result<()> {
        if self.current.can_file() {
            Ok(())
        } else {
            Err(Error::precondition("filed", self.current))
        }
    }

    /// Check that the report may be cancelled without changing state.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` unless the current state can be cancelled.
    pub fn check_cancel(&self) -> Result<()> {
        if self.current.can_cancel() {
            Ok(())
        } else {
            Err(Error::precondition("cancelled", self.current))
        }
    }

    fn transition(&mut self, to: ReportState, via: &'static str) {
        if self.current == to {
            debug!(state = %to, via, "PIREP state unchanged");
        } else {
            info!(from = %self.current, to = %to, via, "PIREP state transition");
        }
        self.current = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_is_inverse_of_can_update() {
        for state in ReportState::ALL {
            assert_eq!(state.is_read_only(), !state.can_update(), "{state}");
        }
    }

    #[test]
    fn test_can_file_exhaustive() {
        for state in ReportState::ALL {
            let expected = matches!(
                state,
                ReportState::InProgress | ReportState::Draft | ReportState::Paused
            );
            assert_eq!(state.can_file(), expected, "{state}");
        }
    }

    #[test]
    fn test_can_cancel_exhaustive() {
        for state in ReportState::ALL {
            let expected = !matches!(
                state,
                ReportState::Accepted
                    | ReportState::Rejected
                    | ReportState::Cancelled
                    | ReportState::Deleted
            );
            assert_eq!(state.can_cancel(), expected, "{state}");
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ReportState::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(ReportState::Paused.to_string(), "PAUSED");
        assert_eq!(ReportState::Rejected.to_string(), "REJECTED");
    }

    #[test]
    fn test_state_codes_round_trip() {
        for state in ReportState::ALL {
            assert_eq!(ReportState::try_from(state.code()), Ok(state));
        }
        assert!(ReportState::try_from(8).is_err());
        assert!(ReportState::try_from(-1).is_err());
    }

    #[test]
    fn test_state_deserializes_from_code() {
        let state: ReportState = serde_json::from_str("7").unwrap();
        assert_eq!(state, ReportState::Paused);
        assert_eq!(serde_json::to_string(&ReportState::Accepted).unwrap(), "2");
        assert!(serde_json::from_str::<ReportState>("42").is_err());
    }

    #[test]
    fn test_flight_phase_vocabulary() {
        let codes = [
            "INI", "BST", "TXI", "TOF", "TKO", "ENR", "TEN", "LDG", "LAN", "ARR", "DX", "PSD",
        ];
        for code in codes {
            let phase: FlightPhase = code.parse().unwrap();
            assert_eq!(phase.code(), code);
        }
    }

    #[test]
    fn test_flight_phase_rejects_unknown() {
        for code in ["XYZ", "", "enr", "ENR "] {
            let err = code.parse::<FlightPhase>().unwrap_err();
            assert!(matches!(err, Error::InvalidStatus(ref s) if s == code));
        }
    }

    #[test]
    fn test_machine_starts_in_progress() {
        assert_eq!(StateMachine::new().current(), ReportState::InProgress);
    }

    #[test]
    fn test_file_transitions_to_pending() {
        let mut machine = StateMachine::new();
        machine.file().unwrap();
        assert_eq!(machine.current(), ReportState::Pending);
    }

    #[test]
    fn test_file_from_read_only_fails_and_keeps_state() {
        let mut machine = StateMachine::new();
        machine.observe(ReportState::Accepted);

        let err = machine.file().unwrap_err();
        assert!(matches!(
            err,
            Error::PreconditionFailed {
                state: ReportState::Accepted,
                ..
            }
        ));
        assert_eq!(machine.current(), ReportState::Accepted);
    }

    #[test]
    fn test_file_from_pending_fails() {
        let mut machine = StateMachine::new();
        machine.file().unwrap();
        assert!(machine.file().is_err());
        assert_eq!(machine.current(), ReportState::Pending);
    }

    #[test]
    fn test_cancel_transitions_and_is_terminal() {
        let mut machine = StateMachine::new();
        machine.observe(ReportState::Paused);
        machine.cancel().unwrap();
        assert_eq!(machine.current(), ReportState::Cancelled);

        assert!(machine.cancel().is_err());
        assert!(machine.file().is_err());
        assert!(machine.check_update().is_err());
        assert_eq!(machine.current(), ReportState::Cancelled);
    }

    #[test]
    fn test_reset_from_any_state() {
        for state in ReportState::ALL {
            let mut machine = StateMachine::new();
            machine.observe(state);
            machine.reset();
            assert_eq!(machine.current(), ReportState::InProgress);
        }
    }

    #[test]
    fn test_adopt_forces_in_progress() {
        let mut machine = StateMachine::new();
        machine.observe(ReportState::Cancelled);
        machine.adopt();
        assert_eq!(machine.current(), ReportState::InProgress);
    }

    #[test]
    fn test_check_update_does_not_change_state() {
        for state in ReportState::ALL {
            let mut machine = StateMachine::new();
            machine.observe(state);
            let result = machine.check_update();
            assert_eq!(result.is_ok(), state.can_update());
            assert_eq!(machine.current(), state);
        }
    }

    #[test]
    fn test_check_file_and_cancel_match_predicates() {
        for state in ReportState::ALL {
            let mut machine = StateMachine::new();
            machine.observe(state);
            assert_eq!(machine.check_file().is_ok(), state.can_file());
            assert_eq!(machine.check_cancel().is_ok(), state.can_cancel());
        }
    }
}
