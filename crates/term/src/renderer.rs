//! TerminalRenderer: flushes a framebuffer to a real terminal.
//!
//! Only glyphs that changed since the previous frame are written; a size change or an
//! explicit [`TerminalRenderer::invalidate`] forces one full redraw.

use std::io::{self, Write};

use anyhow::Result;

use crossterm::{
    cursor,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal, QueueableCommand,
};

use crate::fb::{CellStyle, FrameBuffer, Glyph, Rgb};

pub struct TerminalRenderer {
    stdout: io::Stdout,
    previous: FrameBuffer,
    full_redraw: bool,
    active: bool,
    out: Vec<u8>,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            previous: FrameBuffer::new(0, 0),
            full_redraw: true,
            active: false,
            out: Vec::with_capacity(64 * 1024),
        }
    }

    /// Switch to raw mode and the alternate screen.
    pub fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.active = true;
        self.out.clear();
        self.out.queue(terminal::EnterAlternateScreen)?;
        self.out.queue(cursor::Hide)?;
        self.out.queue(terminal::DisableLineWrap)?;
        self.flush()?;
        self.full_redraw = true;
        Ok(())
    }

    /// Restore the terminal. Safe to call more than once.
    pub fn exit(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.out.clear();
        self.out.queue(ResetColor)?;
        self.out.queue(SetAttribute(Attribute::Reset))?;
        self.out.queue(terminal::EnableLineWrap)?;
        self.out.queue(cursor::Show)?;
        self.out.queue(terminal::LeaveAlternateScreen)?;
        self.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Force the next frame to be a full redraw (e.g. after a resize event).
    pub fn invalidate(&mut self) {
        self.full_redraw = true;
    }

    /// Draw `frame`, then swap it with the retained previous frame.
    ///
    /// The caller gets the older buffer back and renders the next frame into it, so
    /// no frame is ever cloned.
    pub fn present(&mut self, frame: &mut FrameBuffer) -> Result<()> {
        self.out.clear();
        let resized = (self.previous.width(), self.previous.height())
            != (frame.width(), frame.height());
        if self.full_redraw || resized {
            encode_full_into(frame, &mut self.out)?;
            self.full_redraw = false;
        } else {
            encode_diff_into(&self.previous, frame, &mut self.out)?;
        }
        self.flush()?;

        std::mem::swap(&mut self.previous, frame);
        frame.resize(self.previous.width(), self.previous.height());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.stdout.write_all(&self.out)?;
        self.stdout.flush()?;
        Ok(())
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        let _ = self.exit();
    }
}

/// Encode a full-frame redraw into `out`.
pub fn encode_full_into(fb: &FrameBuffer, out: &mut Vec<u8>) -> Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    let mut style = None;
    for y in 0..fb.height() {
        out.queue(cursor::MoveTo(0, y))?;
        for x in 0..fb.width() {
            write_glyph(out, fb.get(x, y).unwrap_or_default(), &mut style)?;
        }
    }
    reset_into(out)
}

/// Encode only the runs of glyphs that differ between `prev` and `next`.
///
/// Both buffers must have the same size.
pub fn encode_diff_into(prev: &FrameBuffer, next: &FrameBuffer, out: &mut Vec<u8>) -> Result<()> {
    let mut style = None;
    for (x, y, len) in changed_runs(prev, next) {
        out.queue(cursor::MoveTo(x, y))?;
        for dx in 0..len {
            write_glyph(out, next.get(x + dx, y).unwrap_or_default(), &mut style)?;
        }
    }
    reset_into(out)
}

fn write_glyph(out: &mut Vec<u8>, glyph: Glyph, current: &mut Option<CellStyle>) -> Result<()> {
    if *current != Some(glyph.style) {
        let s = glyph.style;
        out.queue(SetAttribute(Attribute::Reset))?;
        out.queue(SetForegroundColor(to_color(s.fg)))?;
        out.queue(SetBackgroundColor(to_color(s.bg)))?;
        if s.bold {
            out.queue(SetAttribute(Attribute::Bold))?;
        }
        if s.dim {
            out.queue(SetAttribute(Attribute::Dim))?;
        }
        *current = Some(s);
    }
    out.queue(Print(glyph.ch))?;
    Ok(())
}

fn reset_into(out: &mut Vec<u8>) -> Result<()> {
    out.queue(ResetColor)?;
    out.queue(SetAttribute(Attribute::Reset))?;
    Ok(())
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.r,
        g: rgb.g,
        b: rgb.b,
    }
}

/// Maximal horizontal runs `(x, y, len)` of differing glyphs, row by row.
fn changed_runs(prev: &FrameBuffer, next: &FrameBuffer) -> Vec<(u16, u16, u16)> {
    let mut runs = Vec::new();
    for y in 0..next.height() {
        let mut start: Option<u16> = None;
        for x in 0..next.width() {
            let differs = prev.get(x, y) != next.get(x, y);
            match (differs, start) {
                (true, None) => start = Some(x),
                (false, Some(s)) => {
                    runs.push((s, y, x - s));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push((s, y, next.width() - s));
        }
    }
    runs
}
