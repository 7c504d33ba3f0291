//! Protocol module - peer message types and the length-prefixed frame codec
//!
//! Every frame is a 4-byte big-endian payload length followed by one JSON-encoded
//! [`PeerMessage`]. Messages are internally tagged by a `type` field; an unknown tag or a
//! snapshot whose contents are out of range is a hard decode failure.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::core::{get_shape, rotation_count, Board, EngineSnapshot, Piece};
use crate::error::{NetError, Result};
use crate::types::{PieceKind, SeatId, BOARD_CELLS, BOARD_HEIGHT, BOARD_WIDTH, MAX_PLAYERS};

/// Length of the frame header in bytes
pub const FRAME_HEADER_LEN: usize = 4;

/// Rows above the board a falling piece may occupy
const PIECE_ROWS_ABOVE: i16 = 4;

/// A message exchanged between peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    /// Host to guest, once per guest right after accept.
    AssignId { seat: u8 },
    /// Full externally visible state of the sender, at most once per tick.
    StateSnapshot(PeerSnapshot),
    /// Generated locally when a channel faults; never on the wire.
    #[serde(skip)]
    ConnectionLost,
}

impl PeerMessage {
    /// Whether this message may be written to a stream
    pub fn is_sendable(&self) -> bool {
        !matches!(self, PeerMessage::ConnectionLost)
    }

    fn validate(&self) -> Result<()> {
        match self {
            PeerMessage::AssignId { seat } => match SeatId::new(*seat) {
                Some(id) if !id.is_host() => Ok(()),
                _ => Err(NetError::InvalidSeat(*seat)),
            },
            PeerMessage::StateSnapshot(snapshot) => snapshot.validate(),
            PeerMessage::ConnectionLost => Ok(()),
        }
    }
}

/// Placement of the sender's falling piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiecePlacement {
    pub kind: WireKind,
    pub rotation: u8,
    pub x: i8,
    pub y: i8,
}

impl PiecePlacement {
    /// Rotation must exist and every cell must lie within the board columns and at
    /// most a few rows above the top
    fn validate(&self) -> Result<()> {
        let kind = PieceKind::from(self.kind);
        if self.rotation >= rotation_count(kind) {
            return Err(NetError::InvalidSnapshot(format!(
                "rotation {} out of range for {:?}",
                self.rotation, self.kind
            )));
        }
        let inside = get_shape(kind, self.rotation).iter().all(|&(dx, dy)| {
            let x = self.x as i16 + dx as i16;
            let y = self.y as i16 + dy as i16;
            (0..BOARD_WIDTH as i16).contains(&x)
                && (-PIECE_ROWS_ABOVE..BOARD_HEIGHT as i16).contains(&y)
        });
        if !inside {
            return Err(NetError::InvalidSnapshot(format!(
                "piece at ({}, {}) is off the board",
                self.x, self.y
            )));
        }
        Ok(())
    }
}

/// Piece kind as its lowercase letter on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl From<PieceKind> for WireKind {
    fn from(kind: PieceKind) -> Self {
        match kind {
            PieceKind::I => WireKind::I,
            PieceKind::O => WireKind::O,
            PieceKind::T => WireKind::T,
            PieceKind::S => WireKind::S,
            PieceKind::Z => WireKind::Z,
            PieceKind::J => WireKind::J,
            PieceKind::L => WireKind::L,
        }
    }
}

impl From<WireKind> for PieceKind {
    fn from(kind: WireKind) -> Self {
        match kind {
            WireKind::I => PieceKind::I,
            WireKind::O => PieceKind::O,
            WireKind::T => PieceKind::T,
            WireKind::S => PieceKind::S,
            WireKind::Z => PieceKind::Z,
            WireKind::J => PieceKind::J,
            WireKind::L => PieceKind::L,
        }
    }
}

impl From<Piece> for PiecePlacement {
    fn from(piece: Piece) -> Self {
        Self {
            kind: piece.kind.into(),
            rotation: piece.rotation,
            x: piece.x,
            y: piece.y,
        }
    }
}

impl From<PiecePlacement> for Piece {
    fn from(p: PiecePlacement) -> Self {
        Self {
            kind: p.kind.into(),
            rotation: p.rotation,
            x: p.x,
            y: p.y,
        }
    }
}

/// One peer's replicated state
///
/// Each snapshot fully supersedes the previous one from the same seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerSnapshot {
    pub seat: u8,
    /// Row-major color ids, H·W entries (0 empty, 1..=7 pieces, 8 garbage).
    pub board: Vec<u8>,
    pub piece: Option<PiecePlacement>,
    pub next: WireKind,
    pub score: u32,
    pub lines: u32,
    pub game_over: bool,
    pub ready: bool,
    pub started: bool,
    /// Garbage rows this snapshot sends to every opponent.
    pub garbage_lines: u32,
}

impl PeerSnapshot {
    /// Build the outbound snapshot for `seat` from the local engine state
    pub fn from_engine(
        seat: SeatId,
        engine: &EngineSnapshot,
        ready: bool,
        garbage_lines: u32,
    ) -> Self {
        Self {
            seat: seat.get(),
            board: engine.board.color_ids(),
            piece: engine.active.map(PiecePlacement::from),
            next: engine.next.into(),
            score: engine.score,
            lines: engine.lines,
            game_over: engine.game_over,
            ready,
            started: engine.started,
            garbage_lines,
        }
    }

    pub fn seat_id(&self) -> Option<SeatId> {
        SeatId::new(self.seat)
    }

    /// Check that every field is in range
    pub fn validate(&self) -> Result<()> {
        if self.seat >= MAX_PLAYERS {
            return Err(NetError::InvalidSeat(self.seat));
        }
        if self.board.len() != BOARD_CELLS {
            return Err(NetError::InvalidSnapshot(format!(
                "board has {} cells, expected {}",
                self.board.len(),
                BOARD_CELLS
            )));
        }
        if let Some(bad) = self.board.iter().find(|&&id| id > 8) {
            return Err(NetError::InvalidSnapshot(format!("unknown color id {bad}")));
        }
        if let Some(piece) = self.piece {
            piece.validate()?;
        }
        Ok(())
    }

    /// Rebuild the engine-side view of this snapshot
    pub fn to_engine(&self) -> Result<EngineSnapshot> {
        let board = Board::from_color_ids(&self.board)
            .ok_or_else(|| NetError::InvalidSnapshot("bad board".to_string()))?;
        Ok(EngineSnapshot {
            board,
            active: self.piece.map(Piece::from),
            next: self.next.into(),
            score: self.score,
            lines: self.lines,
            started: self.started,
            game_over: self.game_over,
        })
    }
}

/// Serialize one message into `out` as a complete frame (header + payload)
///
/// `out` is cleared first so callers can reuse one buffer for every send.
pub fn encode_frame(message: &PeerMessage, out: &mut Vec<u8>) -> Result<()> {
    if !message.is_sendable() {
        return Err(NetError::NotSendable);
    }

    out.clear();
    out.extend_from_slice(&[0u8; FRAME_HEADER_LEN]);
    serde_json::to_writer(&mut *out, message)?;

    let len = out.len() - FRAME_HEADER_LEN;
    let len32 = u32::try_from(len).map_err(|_| NetError::FrameTooLarge {
        len,
        max: u32::MAX as usize,
    })?;
    out[..FRAME_HEADER_LEN].copy_from_slice(&len32.to_be_bytes());
    Ok(())
}

/// Decode and validate one frame payload (without its header)
pub fn decode_payload(payload: &[u8]) -> Result<PeerMessage> {
    if payload.is_empty() {
        return Err(NetError::EmptyFrame);
    }
    let message: PeerMessage = serde_json::from_slice(payload)?;
    message.validate()?;
    Ok(message)
}

/// Read one complete frame from `reader`
///
/// Partial reads are reassembled by `read_exact`. A clean end of stream before a
/// header is [`NetError::Closed`]; an end of stream inside a frame is an I/O error.
pub async fn read_frame<R>(reader: &mut R, max_frame: usize, buf: &mut Vec<u8>) -> Result<PeerMessage>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(NetError::Closed),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(header) as usize;
    if len == 0 {
        return Err(NetError::EmptyFrame);
    }
    if len > max_frame {
        return Err(NetError::FrameTooLarge {
            len,
            max: max_frame,
        });
    }

    buf.clear();
    buf.resize(len, 0);
    reader.read_exact(buf).await?;
    decode_payload(buf)
}
