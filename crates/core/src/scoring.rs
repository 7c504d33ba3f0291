//! Scoring module - line clear points and the garbage attack table
//!
//! Every cleared row is worth 100 points, with no level multiplier or multi-line bonus. The attack table decides
//! how many garbage rows a simultaneous clear sends to every opponent:
//! 0 or 1 line sends nothing, 2 lines send 1, 3 lines send 2, 4 lines send 4.

use crate::types::{GARBAGE_TABLE, LINE_SCORES};

/// Points for clearing `lines` rows at once
pub fn line_clear_score(lines: usize) -> u32 {
    LINE_SCORES.get(lines).copied().unwrap_or(0)
}

/// Garbage rows sent for clearing `lines` rows at once
pub fn garbage_for_lines(lines: usize) -> u8 {
    GARBAGE_TABLE.get(lines).copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_line_scores() {
        assert_eq!(line_clear_score(0), 0);
        assert_eq!(line_clear_score(1), 100);
        assert_eq!(line_clear_score(2), 200);
        assert_eq!(line_clear_score(3), 300);
        assert_eq!(line_clear_score(4), 400);
        assert_eq!(line_clear_score(5), 0);
    }

    #[test]
    fn test_garbage_mapping_is_exact() {
        assert_eq!(garbage_for_lines(0), 0);
        assert_eq!(garbage_for_lines(1), 0);
        assert_eq!(garbage_for_lines(2), 1);
        assert_eq!(garbage_for_lines(3), 2);
        assert_eq!(garbage_for_lines(4), 4);
    }
}
