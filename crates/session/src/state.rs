//! Session state machine - connecting, ready, countdown, playing, game over
//!
//! Every peer runs its own copy. They converge because ready flags are replicated in
//! snapshots and every copy fires the same transition from the same observed
//! condition; the countdown itself is a local timer.

use tracing::info;

use crate::types::{SeatId, COUNTDOWN_FROM, COUNTDOWN_STEP_MS, MAX_PLAYERS};

/// How a match ended for this peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
    OpponentDisconnected,
}

impl Outcome {
    pub fn banner(&self) -> &'static str {
        match self {
            Outcome::Win => "YOU WIN",
            Outcome::Lose => "YOU LOSE",
            Outcome::OpponentDisconnected => "OPPONENT DISCONNECTED",
        }
    }
}

/// Lifecycle of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingReady,
    Countdown { remaining: u8 },
    Playing,
    GameOver(Outcome),
}

/// Transition fired by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    PeersAttached,
    CountdownStarted,
    CountdownTick(u8),
    Started,
    Finished(Outcome),
}

/// Per-peer session state
#[derive(Debug, Clone)]
pub struct SessionMachine {
    state: SessionState,
    players: u8,
    local_seat: Option<SeatId>,
    attached: u8,
    ready: [bool; MAX_PLAYERS as usize],
    countdown_timer_ms: u32,
}

impl SessionMachine {
    /// Create a session for `players` peers
    ///
    /// `local_seat` is None for a guest that still waits for its seat assignment.
    pub fn new(players: u8, local_seat: Option<SeatId>) -> Self {
        Self {
            state: SessionState::Connecting,
            players: players.clamp(2, MAX_PLAYERS),
            local_seat,
            attached: 0,
            ready: [false; MAX_PLAYERS as usize],
            countdown_timer_ms: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn players(&self) -> u8 {
        self.players
    }

    pub fn local_seat(&self) -> Option<SeatId> {
        self.local_seat
    }

    pub fn is_over(&self) -> bool {
        matches!(self.state, SessionState::GameOver(_))
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            SessionState::GameOver(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn countdown(&self) -> Option<u8> {
        match self.state {
            SessionState::Countdown { remaining } => Some(remaining),
            _ => None,
        }
    }

    pub fn is_ready(&self, seat: SeatId) -> bool {
        self.ready[seat.index()]
    }

    pub fn local_ready(&self) -> bool {
        self.local_seat.map(|s| self.is_ready(s)).unwrap_or(false)
    }

    /// Peers this session needs before it can leave `Connecting`
    fn expected_peers(&self) -> u8 {
        match self.local_seat {
            Some(seat) if seat.is_host() => self.players - 1,
            _ => 1,
        }
    }

    fn set_state(&mut self, state: SessionState) {
        info!("session {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn try_leave_connecting(&mut self) -> Option<SessionEvent> {
        if self.state != SessionState::Connecting {
            return None;
        }
        if self.local_seat.is_none() || self.attached < self.expected_peers() {
            return None;
        }
        self.set_state(SessionState::AwaitingReady);
        Some(SessionEvent::PeersAttached)
    }

    /// A transport peer finished connecting
    pub fn peer_attached(&mut self) -> Option<SessionEvent> {
        self.attached = self.attached.saturating_add(1);
        self.try_leave_connecting()
    }

    /// The host told us which seat we occupy
    ///
    /// Only the first assignment counts.
    pub fn assign_local_seat(&mut self, seat: SeatId) -> Option<SessionEvent> {
        if self.local_seat.is_some() && self.state != SessionState::Connecting {
            return None;
        }
        if self.local_seat != Some(seat) {
            info!("assigned seat {}", seat.label());
        }
        self.local_seat = Some(seat);
        self.try_leave_connecting()
    }

    /// Flip the local ready flag; only while waiting for players to be ready
    ///
    /// Returns true if the flag changed.
    pub fn toggle_local_ready(&mut self) -> bool {
        let Some(seat) = self.local_seat else {
            return false;
        };
        if self.state != SessionState::AwaitingReady {
            return false;
        }
        let flag = &mut self.ready[seat.index()];
        *flag = !*flag;
        true
    }

    /// Record a remote peer's ready flag as seen in its latest snapshot
    pub fn set_remote_ready(&mut self, seat: SeatId, ready: bool) {
        if Some(seat) == self.local_seat || seat.get() >= self.players {
            return;
        }
        if matches!(
            self.state,
            SessionState::Connecting | SessionState::AwaitingReady
        ) {
            self.ready[seat.index()] = ready;
        }
    }

    fn all_ready(&self) -> bool {
        self.ready[..self.players as usize].iter().all(|&r| r)
    }

    /// Evaluate transitions for one tick
    ///
    /// `local_over` is this peer's engine game-over flag, `remotes_over` is true when
    /// every remote mirror reports game over. A local top-out is checked first, so
    /// both flags in the same tick count as a loss.
    pub fn advance(
        &mut self,
        elapsed_ms: u32,
        local_over: bool,
        remotes_over: bool,
    ) -> Option<SessionEvent> {
        match self.state {
            SessionState::Connecting | SessionState::GameOver(_) => None,
            SessionState::AwaitingReady => {
                if !self.all_ready() {
                    return None;
                }
                self.countdown_timer_ms = 0;
                self.set_state(SessionState::Countdown {
                    remaining: COUNTDOWN_FROM,
                });
                Some(SessionEvent::CountdownStarted)
            }
            SessionState::Countdown { remaining } => {
                self.countdown_timer_ms = self.countdown_timer_ms.saturating_add(elapsed_ms);
                if self.countdown_timer_ms < COUNTDOWN_STEP_MS {
                    return None;
                }
                self.countdown_timer_ms -= COUNTDOWN_STEP_MS;
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.set_state(SessionState::Playing);
                    Some(SessionEvent::Started)
                } else {
                    self.state = SessionState::Countdown { remaining };
                    Some(SessionEvent::CountdownTick(remaining))
                }
            }
            SessionState::Playing => {
                let outcome = if local_over {
                    Outcome::Lose
                } else if remotes_over {
                    Outcome::Win
                } else {
                    return None;
                };
                self.set_state(SessionState::GameOver(outcome));
                Some(SessionEvent::Finished(outcome))
            }
        }
    }

    /// A channel faulted: end the session unless it already ended
    pub fn connection_lost(&mut self) -> Option<SessionEvent> {
        if self.is_over() {
            return None;
        }
        let outcome = Outcome::OpponentDisconnected;
        self.set_state(SessionState::GameOver(outcome));
        Some(SessionEvent::Finished(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest(id: u8) -> SeatId {
        SeatId::new(id).unwrap()
    }

    fn ready_two_player() -> SessionMachine {
        let mut s = SessionMachine::new(2, Some(SeatId::HOST));
        s.peer_attached();
        s
    }

    #[test]
    fn test_host_waits_for_every_guest() {
        let mut s = SessionMachine::new(3, Some(SeatId::HOST));
        assert_eq!(s.peer_attached(), None);
        assert_eq!(s.state(), SessionState::Connecting);
        assert_eq!(s.peer_attached(), Some(SessionEvent::PeersAttached));
        assert_eq!(s.state(), SessionState::AwaitingReady);
    }

    #[test]
    fn test_three_player_guest_waits_for_seat() {
        let mut s = SessionMachine::new(3, None);
        assert_eq!(s.peer_attached(), None);
        assert!(!s.toggle_local_ready());
        assert_eq!(
            s.assign_local_seat(guest(2)),
            Some(SessionEvent::PeersAttached)
        );
        assert_eq!(s.local_seat(), Some(guest(2)));
    }

    #[test]
    fn test_ready_toggle_only_while_awaiting() {
        let mut s = SessionMachine::new(2, Some(SeatId::HOST));
        assert!(!s.toggle_local_ready());
        s.peer_attached();
        assert!(s.toggle_local_ready());
        assert!(s.local_ready());
        assert!(s.toggle_local_ready());
        assert!(!s.local_ready());
    }

    #[test]
    fn test_countdown_needs_every_peer_ready() {
        let mut s = ready_two_player();
        s.toggle_local_ready();
        assert_eq!(s.advance(16, false, false), None);
        assert_eq!(s.state(), SessionState::AwaitingReady);

        s.set_remote_ready(guest(1), true);
        assert_eq!(s.advance(16, false, false), Some(SessionEvent::CountdownStarted));
        assert_eq!(s.state(), SessionState::Countdown { remaining: 3 });
    }

    #[test]
    fn test_countdown_decrements_once_per_second() {
        let mut s = ready_two_player();
        s.toggle_local_ready();
        s.set_remote_ready(guest(1), true);
        s.advance(0, false, false);

        assert_eq!(s.advance(999, false, false), None);
        assert_eq!(s.advance(1, false, false), Some(SessionEvent::CountdownTick(2)));
        assert_eq!(s.advance(1000, false, false), Some(SessionEvent::CountdownTick(1)));
        assert_eq!(s.advance(1000, false, false), Some(SessionEvent::Started));
        assert_eq!(s.state(), SessionState::Playing);
    }

    #[test]
    fn test_outcomes_and_terminal_state() {
        let mut s = ready_two_player();
        s.toggle_local_ready();
        s.set_remote_ready(guest(1), true);
        s.advance(0, false, false);
        for _ in 0..3 {
            s.advance(COUNTDOWN_STEP_MS, false, false);
        }

        assert_eq!(
            s.advance(16, false, true),
            Some(SessionEvent::Finished(Outcome::Win))
        );
        assert_eq!(s.advance(16, true, false), None);
        assert_eq!(s.connection_lost(), None);
        assert_eq!(s.outcome(), Some(Outcome::Win));
    }

    #[test]
    fn test_local_top_out_wins_tie() {
        let mut s = ready_two_player();
        s.toggle_local_ready();
        s.set_remote_ready(guest(1), true);
        s.advance(0, false, false);
        for _ in 0..3 {
            s.advance(COUNTDOWN_STEP_MS, false, false);
        }
        assert_eq!(
            s.advance(16, true, true),
            Some(SessionEvent::Finished(Outcome::Lose))
        );
    }

    #[test]
    fn test_connection_lost_from_any_live_state() {
        let mut s = SessionMachine::new(2, Some(SeatId::HOST));
        assert_eq!(
            s.connection_lost(),
            Some(SessionEvent::Finished(Outcome::OpponentDisconnected))
        );
        assert_eq!(s.advance(16, false, false), None);
    }

    #[test]
    fn test_remote_ready_ignored_for_local_seat() {
        let mut s = ready_two_player();
        s.set_remote_ready(SeatId::HOST, true);
        assert!(!s.local_ready());
    }
}
