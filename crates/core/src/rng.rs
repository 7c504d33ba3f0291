//! RNG module - seeded random piece and garbage-hole generation
//!
//! Pieces are drawn uniformly at random (no bag), with a one-piece preview.
//! A simple LCG keeps every engine reproducible from its seed, which the tests rely on.

use crate::types::PieceKind;

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    ///
    /// Scales by the high bits; the low bits of a power-of-two LCG cycle quickly.
    pub fn next_range(&mut self, max: u32) -> u32 {
        ((self.next_u32() as u64 * max as u64) >> 32) as u32
    }

    /// Uniformly random piece kind
    pub fn next_kind(&mut self) -> PieceKind {
        PieceKind::ALL[self.next_range(PieceKind::ALL.len() as u32) as usize]
    }
}

/// Piece generator with a one-piece "next" preview
#[derive(Debug, Clone)]
pub struct PieceQueue {
    next: PieceKind,
    rng: SimpleRng,
    seed: u32,
}

impl PieceQueue {
    /// Create a new piece queue with the given seed
    pub fn new(seed: u32) -> Self {
        let mut rng = SimpleRng::new(seed);
        let next = rng.next_kind();
        Self { next, rng, seed }
    }

    /// Peek at the next piece without removing it
    pub fn peek(&self) -> PieceKind {
        self.next
    }

    /// Draw the next piece and roll a new preview
    pub fn draw(&mut self) -> PieceKind {
        let piece = self.next;
        self.next = self.rng.next_kind();
        piece
    }

    /// The seed this queue was created with (for restarting with the same sequence)
    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl Default for PieceQueue {
    fn default() -> Self {
        Self::new(1)
    }
}
