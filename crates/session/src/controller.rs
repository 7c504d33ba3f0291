//! Match controller - one tick of a networked match
//!
//! Owns the local engine, the session state machine, one mirror per remote seat and
//! one channel per connected peer. Everything here runs on the tick thread.
//!
//! Per tick:
//! 1. a broken channel ends the session before anything else moves
//! 2. the local engine advances (only while playing)
//! 3. inbound messages are drained into mirrors, ready flags and pending garbage;
//!    the host relays guest snapshots to the other guest
//! 4. session transitions are evaluated
//! 5. one snapshot, carrying the garbage produced this tick, goes to every peer

use arrayvec::ArrayVec;
use tracing::{debug, info, warn};

use crate::core::{Board, LocalEngine};
use crate::mirror::PeerMirror;
use crate::net::{PeerConnection, PeerMessage, PeerSnapshot, ReplicationChannel, Role};
use crate::state::{Outcome, SessionEvent, SessionMachine, SessionState};
use crate::types::{GameAction, PieceKind, SeatId, GRAVITY_MS, MAX_PLAYERS};

const MAX_REMOTES: usize = MAX_PLAYERS as usize - 1;

/// Match settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    pub players: u8,
    pub gravity_ms: u32,
    pub seed: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            players: 2,
            gravity_ms: GRAVITY_MS,
            seed: 1,
        }
    }
}

struct PeerLink {
    peer_seat: SeatId,
    channel: ReplicationChannel,
}

/// One board as the presentation layer sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub seat: Option<SeatId>,
    pub is_local: bool,
    /// Locked cells with the falling piece drawn in.
    pub board: Board,
    pub next: Option<PieceKind>,
    pub score: u32,
    pub lines: u32,
    pub ready: bool,
    pub game_over: bool,
    /// False until the first snapshot from a remote seat arrives.
    pub seen: bool,
}

impl BoardView {
    pub fn label(&self) -> &'static str {
        self.seat.map(|s| s.label()).unwrap_or("GUEST")
    }
}

/// Read-only per-tick view of the whole match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchView {
    pub state: SessionState,
    pub players: u8,
    pub countdown: Option<u8>,
    pub outcome: Option<Outcome>,
    pub local: BoardView,
    pub peers: ArrayVec<BoardView, MAX_REMOTES>,
    pub pending_garbage: u32,
}

/// Drives one peer's side of a match
pub struct MatchController {
    config: MatchConfig,
    role: Role,
    engine: LocalEngine,
    session: SessionMachine,
    mirrors: ArrayVec<PeerMirror, MAX_REMOTES>,
    links: ArrayVec<PeerLink, MAX_REMOTES>,
    final_sent: bool,
    quit: bool,
}

impl MatchController {
    pub fn new(config: MatchConfig, role: Role) -> Self {
        let players = config.players.clamp(2, MAX_PLAYERS);
        let config = MatchConfig { players, ..config };

        // A two-player guest can only be seat 1; with three it must wait for the host.
        let local_seat = match role {
            Role::Host => Some(SeatId::HOST),
            Role::Guest if players == 2 => SeatId::new(1),
            Role::Guest => None,
        };

        let mut controller = Self {
            config,
            role,
            engine: LocalEngine::with_gravity(config.seed, config.gravity_ms),
            session: SessionMachine::new(players, local_seat),
            mirrors: ArrayVec::new(),
            links: ArrayVec::new(),
            final_sent: false,
            quit: false,
        };
        controller.sync_mirrors();
        controller
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn session(&self) -> &SessionMachine {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn engine(&self) -> &LocalEngine {
        &self.engine
    }

    pub fn mirrors(&self) -> &[PeerMirror] {
        &self.mirrors
    }

    pub fn local_seat(&self) -> Option<SeatId> {
        self.session.local_seat()
    }

    /// The session reached game over
    pub fn is_finished(&self) -> bool {
        self.session.is_over()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// One mirror for every seat other than ours, once our seat is known
    fn sync_mirrors(&mut self) {
        let Some(local) = self.session.local_seat() else {
            return;
        };
        self.mirrors.retain(|m| m.seat() != local);
        for id in 0..self.config.players {
            let Some(seat) = SeatId::new(id) else {
                continue;
            };
            if seat == local || self.mirrors.iter().any(|m| m.seat() == seat) {
                continue;
            }
            if self.mirrors.try_push(PeerMirror::new(seat)).is_err() {
                break;
            }
        }
        self.mirrors.sort_by_key(|m| m.seat());
    }

    /// Take ownership of a newly connected peer
    pub fn attach(&mut self, connection: PeerConnection) {
        let PeerConnection { peer_seat, channel } = connection;
        let link = PeerLink { peer_seat, channel };
        if let Err(rejected) = self.links.try_push(link) {
            warn!("no room for peer {}, closing", rejected.element().channel.peer());
            return;
        }
        info!("attached {} ({})", peer_seat.label(), self.links.len());
        self.session.peer_attached();
    }

    /// A failed accept or connect: nothing to play against
    pub fn connection_failed(&mut self) {
        self.session.connection_lost();
    }

    /// Apply one operator command
    ///
    /// Returns true if it changed anything.
    pub fn handle_command(&mut self, action: GameAction) -> bool {
        match action {
            GameAction::Quit => {
                self.shutdown();
                true
            }
            GameAction::ToggleReady => self.session.toggle_local_ready(),
            _ if self.session.state() == SessionState::Playing => {
                self.engine.apply_action(action)
            }
            _ => false,
        }
    }

    fn any_link_broken(&self) -> bool {
        self.links.iter().any(|l| l.channel.is_broken())
    }

    fn remotes_over(&self) -> bool {
        !self.mirrors.is_empty() && self.mirrors.iter().all(|m| m.game_over())
    }

    /// Advance the match by `elapsed_ms`
    pub fn tick(&mut self, elapsed_ms: u32) -> Option<SessionEvent> {
        if self.quit {
            return None;
        }
        if self.final_sent {
            // Keep relaying so the remaining guests still see each other.
            self.drain_inbound();
            return None;
        }

        if self.any_link_broken() {
            let event = self.session.connection_lost();
            self.send_final();
            return event;
        }

        if self.session.state() == SessionState::Playing {
            self.engine.tick(elapsed_ms);
        }

        let mut event = self.drain_inbound();

        if !self.session.is_over() {
            event = event.or(self.session.advance(
                elapsed_ms,
                self.engine.game_over(),
                self.remotes_over(),
            ));
        }

        if event == Some(SessionEvent::Started) {
            self.start_engine();
        }

        if self.session.is_over() {
            self.send_final();
        } else {
            self.broadcast_snapshot();
        }
        event
    }

    fn start_engine(&mut self) {
        self.engine = LocalEngine::with_gravity(self.config.seed, self.config.gravity_ms);
        self.engine.start();
        info!("engine started with seed {}", self.config.seed);
    }

    /// Drain every channel; returns the seat-assignment or disconnect event it caused
    fn drain_inbound(&mut self) -> Option<SessionEvent> {
        let mut relay: Vec<(usize, PeerSnapshot)> = Vec::new();
        let mut lost = false;
        let mut event = None;
        let local = self.session.local_seat();

        for (index, link) in self.links.iter_mut().enumerate() {
            for message in link.channel.receive_all() {
                match message {
                    PeerMessage::AssignId { seat } => {
                        if self.role == Role::Host {
                            continue;
                        }
                        if let Some(seat) = SeatId::new(seat) {
                            event = event.or(self.session.assign_local_seat(seat));
                        }
                    }
                    PeerMessage::StateSnapshot(snapshot) => {
                        let Some(seat) = snapshot.seat_id() else {
                            continue;
                        };
                        if Some(seat) == local || seat.get() >= self.config.players {
                            continue;
                        }
                        if self.role == Role::Host && seat != link.peer_seat {
                            debug!("snapshot for {} on {}'s link", seat.label(), link.peer_seat.label());
                        }
                        if let Some(mirror) = self.mirrors.iter_mut().find(|m| m.seat() == seat) {
                            if let Err(e) = mirror.apply(&snapshot) {
                                warn!("dropping snapshot from {}: {}", seat.label(), e);
                                continue;
                            }
                        }
                        self.session.set_remote_ready(seat, snapshot.ready);
                        if self.session.state() == SessionState::Playing {
                            self.engine.add_pending_garbage(snapshot.garbage_lines);
                        }
                        if self.role == Role::Host {
                            relay.push((index, snapshot));
                        }
                    }
                    PeerMessage::ConnectionLost => lost = true,
                }
            }
        }

        if self.local_seat() != local {
            self.sync_mirrors();
        }

        for (from, snapshot) in relay {
            let message = PeerMessage::StateSnapshot(snapshot);
            for (index, link) in self.links.iter_mut().enumerate() {
                if index == from || link.channel.is_broken() {
                    continue;
                }
                if let Err(e) = link.channel.send(&message) {
                    warn!("relay to {} failed: {}", link.peer_seat.label(), e);
                }
            }
        }

        if lost {
            self.session.connection_lost().or(event)
        } else {
            event
        }
    }

    fn outbound_snapshot(&mut self) -> Option<PeerMessage> {
        let seat = self.session.local_seat()?;
        let garbage = self.engine.take_outgoing_garbage();
        if garbage > 0 {
            debug!("sending {} garbage row(s)", garbage);
        }
        Some(PeerMessage::StateSnapshot(PeerSnapshot::from_engine(
            seat,
            &self.engine.snapshot(),
            self.session.local_ready(),
            garbage,
        )))
    }

    fn broadcast_snapshot(&mut self) {
        let Some(message) = self.outbound_snapshot() else {
            return;
        };
        for link in self.links.iter_mut() {
            if link.channel.is_broken() {
                continue;
            }
            if let Err(e) = link.channel.send(&message) {
                warn!("snapshot to {} failed: {}", link.peer_seat.label(), e);
            }
        }
    }

    /// One last snapshot so peers observe how this side ended
    fn send_final(&mut self) {
        if self.final_sent {
            return;
        }
        self.broadcast_snapshot();
        self.final_sent = true;
        if let Some(outcome) = self.session.outcome() {
            info!("match over: {}", outcome.banner());
        }
    }

    /// Close every channel
    pub fn shutdown(&mut self) {
        if self.quit {
            return;
        }
        self.quit = true;
        for link in self.links.iter_mut() {
            link.channel.close();
        }
        info!("match controller shut down");
    }

    /// Snapshot of everything the presentation layer draws
    pub fn view(&self) -> MatchView {
        let snapshot = self.engine.snapshot();
        let local = BoardView {
            seat: self.session.local_seat(),
            is_local: true,
            board: snapshot.composed_board(),
            next: snapshot.started.then_some(snapshot.next),
            score: snapshot.score,
            lines: snapshot.lines,
            ready: self.session.local_ready(),
            game_over: snapshot.game_over,
            seen: true,
        };

        let peers = self
            .mirrors
            .iter()
            .map(|m| BoardView {
                seat: Some(m.seat()),
                is_local: false,
                board: m.state().composed_board(),
                next: m.state().started.then_some(m.state().next),
                score: m.state().score,
                lines: m.state().lines,
                ready: m.ready(),
                game_over: m.game_over(),
                seen: m.has_snapshot(),
            })
            .collect();

        MatchView {
            state: self.session.state(),
            players: self.config.players,
            countdown: self.session.countdown(),
            outcome: self.session.outcome(),
            local,
            peers,
            pending_garbage: self.engine.pending_garbage(),
        }
    }
}

impl Drop for MatchController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
