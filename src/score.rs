pub const MAX_PLY: usize = 255;

pub struct Score;

impl Score {
    pub const MAX: i32 = 32767;
    pub const MATE: i32 = 32766;

    /// Scores beyond this magnitude are proven results (mates, tablebase wins) rather than
    /// evaluations. Static evaluation always stays strictly inside it.
    pub const WIN: i32 = 25000;

    pub const fn is_mate(score: i32) -> bool {
        score.unsigned_abs() >= (Score::MATE - MAX_PLY as i32) as u32
    }

    pub const fn is_win(score: i32) -> bool {
        score.unsigned_abs() > Score::WIN as u32
    }

    pub const fn mate_in(ply: usize) -> i32 {
        Score::MATE - ply as i32
    }

    pub const fn mated_in(ply: usize) -> i32 {
        -Score::MATE + ply as i32
    }
}

/// Formats a score for reporting. Centipawn scores are normalised against the material on the
/// board so that 100 means a 50% win probability.
pub fn format_score(score: i32, material: i32) -> String {
    if Score::is_mate(score) {
        let moves = ((Score::MATE as i64 - (score as i64).abs()).max(1) + 1) / 2;
        if score < 0 {
            format!("mate {}", -moves)
        } else {
            format!("mate {}", moves)
        }
    } else {
        format!("cp {}", crate::wdl::normalize_score(score, material))
    }
}

#[cfg(test)]
mod tests {
    use crate::score::{format_score, Score};

    #[test]
    fn test_format_mate() {
        assert_eq!(format_score(Score::mate_in(1), 78), "mate 1");
        assert_eq!(format_score(Score::mate_in(3), 78), "mate 2");
        assert_eq!(format_score(Score::mated_in(2), 78), "mate -1");
    }

    #[test]
    fn test_format_cp_is_normalised() {
        assert_eq!(format_score(0, 40), "cp 0");
        assert_eq!(format_score(276, 58), "cp 100");
        assert_eq!(format_score(-276, 58), "cp -100");
    }

    #[test]
    fn test_mate_scores_are_wins() {
        assert!(Score::is_win(Score::mate_in(10)));
        assert!(!Score::is_win(Score::WIN - 1));
    }

    #[test]
    fn test_extreme_scores() {
        assert!(Score::is_win(i32::MIN));
        assert!(Score::is_mate(i32::MIN));
        assert_eq!(format_score(i32::MIN, 78), "mate -1");
        assert_eq!(format_score(i32::MAX, 78), "mate 1");
    }
}
