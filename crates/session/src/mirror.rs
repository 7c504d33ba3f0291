//! Peer mirror - the last known state of one remote peer

use crate::core::EngineSnapshot;
use crate::net::{PeerSnapshot, Result};
use crate::types::SeatId;

/// Read-only copy of a remote engine's visible fields
///
/// Overwritten wholesale by every snapshot from its seat; gameplay never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerMirror {
    seat: SeatId,
    state: EngineSnapshot,
    ready: bool,
    received: bool,
}

impl PeerMirror {
    pub fn new(seat: SeatId) -> Self {
        Self {
            seat,
            state: EngineSnapshot::default(),
            ready: false,
            received: false,
        }
    }

    pub fn seat(&self) -> SeatId {
        self.seat
    }

    pub fn state(&self) -> &EngineSnapshot {
        &self.state
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn game_over(&self) -> bool {
        self.state.game_over
    }

    /// Whether any snapshot has arrived yet
    pub fn has_snapshot(&self) -> bool {
        self.received
    }

    /// Replace the mirrored state with `snapshot`
    ///
    /// A snapshot that fails validation leaves the mirror unchanged.
    pub fn apply(&mut self, snapshot: &PeerSnapshot) -> Result<()> {
        snapshot.validate()?;
        self.state = snapshot.to_engine()?;
        self.ready = snapshot.ready;
        self.received = true;
        Ok(())
    }
}
