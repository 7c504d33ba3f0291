//! MatchScreen: maps a [`MatchView`] into a terminal framebuffer.
//!
//! Boards are drawn side by side, local board first. This module is pure (no I/O).

use std::net::SocketAddr;

use crate::fb::{tile_color, CellStyle, FrameBuffer, Glyph, Rgb};
use crate::session::{BoardView, MatchView, SessionState};
use crate::types::{BOARD_HEIGHT, BOARD_WIDTH};

const PANEL_GAP: u16 = 4;
/// Label row above the frame plus three stat rows below it.
const EXTRA_ROWS: u16 = 4;

const WELL_BG: Rgb = Rgb::new(30, 30, 40);
const SCREEN_BG: Rgb = Rgb::new(0, 0, 0);

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Multi-board renderer for a networked match.
pub struct MatchScreen {
    /// Board cell width in terminal columns.
    cell_w: u16,
    /// Board cell height in terminal rows.
    cell_h: u16,
    /// Listening address shown while a host waits for guests.
    host_addr: Option<SocketAddr>,
}

impl Default for MatchScreen {
    fn default() -> Self {
        // 2x1 helps compensate for typical terminal glyph aspect ratio.
        Self {
            cell_w: 2,
            cell_h: 1,
            host_addr: None,
        }
    }
}

impl MatchScreen {
    pub fn new(cell_w: u16, cell_h: u16) -> Self {
        Self {
            cell_w: cell_w.max(1),
            cell_h: cell_h.max(1),
            host_addr: None,
        }
    }

    /// Show where guests should connect while the session is still connecting.
    pub fn with_host_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.host_addr = addr;
        self
    }

    fn frame_size(&self) -> (u16, u16) {
        (
            BOARD_WIDTH as u16 * self.cell_w + 2,
            BOARD_HEIGHT as u16 * self.cell_h + 2,
        )
    }

    /// Render into an existing framebuffer, resizing it to the viewport.
    pub fn render_into(&self, view: &MatchView, viewport: Viewport, fb: &mut FrameBuffer) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(Glyph::default());

        let (frame_w, frame_h) = self.frame_size();
        let boards = 1 + view.peers.len() as u16;
        let total_w = boards * frame_w + (boards - 1) * PANEL_GAP;
        let total_h = frame_h + EXTRA_ROWS + 2;

        let origin_x = viewport.width.saturating_sub(total_w) / 2;
        let origin_y = viewport.height.saturating_sub(total_h) / 2;

        let mut x = origin_x;
        for board in std::iter::once(&view.local).chain(view.peers.iter()) {
            self.draw_board(fb, board, view.state, x, origin_y);
            x = x.saturating_add(frame_w + PANEL_GAP);
        }

        // Overlay on the local board, so each player sees their own result.
        if let Some(text) = banner(view) {
            let style = CellStyle::plain(Rgb::new(255, 255, 255), SCREEN_BG).bold();
            let banner_y = origin_y + 1 + frame_h / 2;
            fb.put_str_centered(origin_x, frame_w, banner_y, &text, style);

            if view.state == SessionState::Connecting {
                if let Some(addr) = self.host_addr {
                    let line = listening_line(addr);
                    let dim = CellStyle::plain(Rgb::new(200, 200, 200), SCREEN_BG);
                    fb.put_str_centered(origin_x, frame_w, banner_y + 2, &line, dim);
                }
            }
        }

        let footer_y = origin_y + frame_h + EXTRA_ROWS + 1;
        let help = CellStyle::default().dim();
        fb.put_str_centered(
            0,
            viewport.width,
            footer_y,
            "←/→ move  ↑ rotate  ↓ soft drop  space hard drop  enter ready  q quit",
            help,
        );
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, view: &MatchView, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(view, viewport, &mut fb);
        fb
    }

    fn draw_board(
        &self,
        fb: &mut FrameBuffer,
        board: &BoardView,
        state: SessionState,
        x: u16,
        y: u16,
    ) {
        let (frame_w, frame_h) = self.frame_size();
        let label = CellStyle::default().bold();
        let value = CellStyle::default();

        let title = if board.is_local {
            format!("{} (You)", board.label())
        } else {
            board.label().to_string()
        };
        fb.put_str_centered(x, frame_w, y, &title, label);

        let top = y + 1;
        let border = CellStyle::plain(Rgb::new(200, 200, 200), SCREEN_BG);
        fb.draw_box(x, top, frame_w, frame_h, border);

        let empty = CellStyle::plain(Rgb::new(90, 90, 100), WELL_BG).dim();
        for cy in 0..BOARD_HEIGHT as i8 {
            for cx in 0..BOARD_WIDTH as i8 {
                let (ch, style) = match board.board.get(cx, cy).flatten() {
                    Some(tile) => ('█', CellStyle::plain(tile_color(tile), WELL_BG)),
                    None => ('·', empty),
                };
                let px = x + 1 + cx as u16 * self.cell_w;
                let py = top + 1 + cy as u16 * self.cell_h;
                fb.fill_rect(px, py, self.cell_w, self.cell_h, ch, style);
            }
        }

        let mut row = top + frame_h;
        fb.put_str(x, row, &format!("SCORE {:>7}", board.score), value);
        row += 1;
        fb.put_str(x, row, &format!("LINES {:>7}", board.lines), value);
        row += 1;
        let next = board.next.map(|k| k.as_str().to_ascii_uppercase());
        fb.put_str(x, row, &format!("NEXT  {:>7}", next.as_deref().unwrap_or("-")), value);
        row += 1;
        let (status, style) = board_status(board, state);
        fb.put_str(x, row, status, style);
    }
}

fn board_status(board: &BoardView, state: SessionState) -> (&'static str, CellStyle) {
    let green = CellStyle::plain(Rgb::new(100, 220, 120), SCREEN_BG).bold();
    let plain = CellStyle::default();
    let red = CellStyle::plain(Rgb::new(220, 80, 80), SCREEN_BG).bold();

    if !board.is_local && !board.seen {
        return ("waiting...", plain.dim());
    }
    if board.game_over {
        return ("TOPPED OUT", red);
    }
    match state {
        SessionState::Connecting | SessionState::AwaitingReady => {
            if board.ready {
                ("READY", green)
            } else {
                ("NOT READY", plain)
            }
        }
        _ => ("", plain),
    }
}

/// Text shown over the local board for the current session state
fn banner(view: &MatchView) -> Option<String> {
    match view.state {
        SessionState::Connecting => Some("WAITING FOR PLAYERS".to_string()),
        SessionState::AwaitingReady if !view.local.ready => Some("PRESS ENTER".to_string()),
        SessionState::AwaitingReady => None,
        SessionState::Countdown { remaining } => Some(remaining.to_string()),
        SessionState::Playing => None,
        SessionState::GameOver(outcome) => Some(outcome.banner().to_string()),
    }
}

/// Where guests should dial; a wildcard bind only names the port
fn listening_line(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        format!("PORT {}", addr.port())
    } else {
        format!("ON {}", addr)
    }
}
