//! Win/draw/loss interpretation of evaluation scores.
//!
//! The model is a logistic curve `1 / (1 + exp((a - x) / b))` whose parameters are cubic
//! polynomials of the material left on the board, fitted on self-play game outcomes.

use crate::board::Board;
use crate::score::Score;

/// Scale of the logistic curve at 58 pawns of material. Only used to unnormalise scores when the
/// material is unknown; normalisation itself always goes through [`wdl_params`].
pub const MATERIAL_58_NORMALIZATION_K: i32 = 276;

const MATERIAL_MIN: i32 = 17;
const MATERIAL_MAX: i32 = 78;
const MATERIAL_REFERENCE: f64 = 58.0;

const AS: [f64; 4] = [-9.84512307, 31.26938914, 38.90125541, 215.67447852];
const BS: [f64; 4] = [-4.71939622, 14.97204573, 9.14352219, 40.60382830];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wdl {
    pub win: i32,
    pub draw: i32,
    pub loss: i32,
}

impl Wdl {
    /// Per-mille win/draw/loss for a side-to-move relative score.
    pub fn from_score(score: i32, material: i32) -> Wdl {
        let (win, loss) = wdl_model(score, material);
        Wdl { win, draw: 1000 - win - loss, loss }
    }
}

/// Material in pawn units as consumed by the model. Out-of-range values are clamped later, in
/// [`wdl_params`].
pub fn material(board: &Board) -> i32 {
    board.material()
}

/// Returns `(a, b)`: the score at which the win probability reaches 50%, and the spread of the
/// curve. Both stay finite and positive for every input.
pub fn wdl_params(material: i32) -> (f64, f64) {
    let m = material.clamp(MATERIAL_MIN, MATERIAL_MAX) as f64 / MATERIAL_REFERENCE;

    let a = ((AS[0] * m + AS[1]) * m + AS[2]) * m + AS[3];
    let b = ((BS[0] * m + BS[1]) * m + BS[2]) * m + BS[3];

    (a, b)
}

/// Returns `(win, loss)` in per-mille for the side the score is relative to.
pub fn wdl_model(score: i32, material: i32) -> (i32, i32) {
    let (a, b) = wdl_params(material);
    let x = score as f64;

    let win = (1000.0 / (1.0 + ((a - x) / b).exp())).round() as i32;
    let loss = (1000.0 / (1.0 + ((a + x) / b).exp())).round() as i32;

    (win, loss)
}

/// Rescales an internal score so that 100 means a 50% chance of winning, whatever the material.
/// Zero and proven results pass through untouched.
pub fn normalize_score(score: i32, material: i32) -> i32 {
    if score == 0 || Score::is_win(score) {
        return score;
    }

    let (a, _) = wdl_params(material);
    (100.0 * score as f64 / a).round() as i32
}

/// Best-effort inverse of [`normalize_score`] when no material count is at hand.
pub fn unnormalize_score_material58(score: i32) -> i32 {
    if score == 0 || Score::is_win(score) {
        score
    } else {
        score * MATERIAL_58_NORMALIZATION_K / 100
    }
}
