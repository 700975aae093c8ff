use crate::board::Board;
use crate::types::piece::Piece;
use crate::types::side::Side;
use crate::types::side::Side::{Black, White};
use crate::types::square::Square;
use crate::types::{File, Rank};

pub const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Errors raised while reading a FEN string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("FEN string cannot be empty")]
    Empty,

    #[error("FEN string has an invalid number of parts: {0}")]
    PartCount(usize),

    #[error("FEN string does not have exactly 8 ranks")]
    RankCount,

    #[error("FEN rank {0} does not add up to 8 squares")]
    RankWidth(usize),

    #[error("Invalid character '{0}' in FEN piece placement")]
    InvalidPiece(char),

    #[error("FEN string must have exactly one white and one black king")]
    KingCount,

    #[error("FEN string has {0} pieces, at most 32 are allowed")]
    TooManyPieces(u32),

    #[error("Invalid side to move '{0}'")]
    InvalidSideToMove(String),

    #[error("Invalid character '{0}' in castle rights")]
    InvalidCastling(char),

    #[error("Invalid en passant square '{0}'")]
    InvalidEnPassant(String),

    #[error("Invalid move counter '{0}'")]
    InvalidCounter(String),
}

impl Board {
    pub fn from_fen(fen: &str) -> Result<Board, FenError> {
        if fen.trim().is_empty() {
            return Err(FenError::Empty);
        }

        let mut board = Board::empty();
        let parts: Vec<&str> = fen.split_whitespace().collect();

        if parts.len() < 2 || parts.len() > 6 {
            return Err(FenError::PartCount(parts.len()));
        }

        let rows: Vec<&str> = parts[0].split('/').collect();
        if rows.len() != 8 {
            return Err(FenError::RankCount);
        }

        for (rank, row) in rows.iter().enumerate() {
            let mut file = 0;
            for ch in row.chars() {
                if file >= 8 {
                    return Err(FenError::RankWidth(8 - rank));
                }
                match ch {
                    '1'..='8' => {
                        file += ch as usize - '0' as usize;
                    }
                    _ => {
                        let piece = Piece::from_char(ch).ok_or(FenError::InvalidPiece(ch))?;
                        let side = if ch.is_ascii_uppercase() { White } else { Black };
                        let sq = Square::from(File::parse(file), Rank::parse(7 - rank));
                        board.toggle_sq(sq, piece, side);
                        file += 1;
                    }
                }
            }
            if file != 8 {
                return Err(FenError::RankWidth(8 - rank));
            }
        }

        let kings = board.pieces(Piece::King);
        if (kings & board.side(White)).count() != 1 || (kings & board.side(Black)).count() != 1 {
            return Err(FenError::KingCount);
        }
        if board.occ().count() > 32 {
            return Err(FenError::TooManyPieces(board.occ().count()));
        }

        board.stm = parse_stm(parts[1])?;
        board.castle = parse_castle_rights(parts.get(2).copied().unwrap_or("-"))?;
        board.ep_sq = parse_ep_sq(parts.get(3).copied().unwrap_or("-"))?;
        board.hm = parse_counter(parts.get(4).copied().unwrap_or("0"))?;
        board.fm = parse_counter(parts.get(5).copied().unwrap_or("1"))?;

        Ok(board)
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        for rank in (0..8).rev() {
            let mut empty_squares = 0;
            for file in 0..8 {
                let sq = Square::from(File::parse(file), Rank::parse(rank));
                match (self.piece_at(sq), self.side_at(sq)) {
                    (Some(piece), Some(side)) => {
                        if empty_squares > 0 {
                            fen.push_str(&empty_squares.to_string());
                            empty_squares = 0;
                        }
                        fen.push(piece_to_char(piece, side));
                    }
                    _ => {
                        empty_squares += 1;
                    }
                }
            }
            if empty_squares > 0 {
                fen.push_str(&empty_squares.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.stm == White { 'w' } else { 'b' });

        fen.push(' ');
        if self.castle & 0b0001 != 0 { fen.push('K'); }
        if self.castle & 0b0010 != 0 { fen.push('Q'); }
        if self.castle & 0b0100 != 0 { fen.push('k'); }
        if self.castle & 0b1000 != 0 { fen.push('q'); }
        if self.castle == 0 { fen.push('-'); }

        fen.push(' ');
        if let Some(ep_sq) = self.ep_sq {
            fen.push((b'a' + (ep_sq.0 % 8)) as char);
            fen.push((b'1' + (ep_sq.0 / 8)) as char);
        } else {
            fen.push('-');
        }

        fen.push(' ');
        fen.push_str(&self.hm.to_string());
        fen.push(' ');
        fen.push_str(&self.fm.to_string());
        fen
    }
}

fn parse_stm(stm: &str) -> Result<Side, FenError> {
    match stm {
        "w" => Ok(White),
        "b" => Ok(Black),
        _ => Err(FenError::InvalidSideToMove(stm.to_string())),
    }
}

fn parse_castle_rights(castle: &str) -> Result<u8, FenError> {
    let mut rights = 0;
    for c in castle.chars() {
        match c {
            'K' => rights |= 0b0001,
            'Q' => rights |= 0b0010,
            'k' => rights |= 0b0100,
            'q' => rights |= 0b1000,
            '-' => (),
            _ => return Err(FenError::InvalidCastling(c)),
        }
    }
    Ok(rights)
}

fn parse_ep_sq(ep_sq: &str) -> Result<Option<Square>, FenError> {
    if ep_sq == "-" {
        return Ok(None);
    }
    let bytes = ep_sq.as_bytes();
    if bytes.len() != 2 || !(b'a'..=b'h').contains(&bytes[0]) || !(b'1'..=b'8').contains(&bytes[1]) {
        return Err(FenError::InvalidEnPassant(ep_sq.to_string()));
    }
    let file = (bytes[0] - b'a') as usize;
    let rank = (bytes[1] - b'1') as usize;
    Ok(Some(Square::from(File::parse(file), Rank::parse(rank))))
}

fn parse_counter<T: std::str::FromStr>(counter: &str) -> Result<T, FenError> {
    counter.parse().map_err(|_| FenError::InvalidCounter(counter.to_string()))
}

fn piece_to_char(piece: Piece, side: Side) -> char {
    let ch = piece.to_char();
    if side == White {
        ch.to_ascii_uppercase()
    } else {
        ch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(Board::from_fen("").err(), Some(FenError::Empty));
    }

    #[test]
    fn test_random_string() {
        assert!(Board::from_fen("random string").is_err());
    }

    #[test]
    fn test_too_many_parts() {
        assert!(Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 extra").is_err());
    }

    #[test]
    fn test_board_has_too_few_ranks() {
        assert_eq!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1").err(),
            Some(FenError::RankCount)
        );
    }

    #[test]
    fn test_board_has_no_kings() {
        assert_eq!(
            Board::from_fen("rnbqbbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQNBNR w KQkq - 0 1").err(),
            Some(FenError::KingCount)
        );
    }

    #[test]
    fn test_board_has_two_white_kings() {
        assert_eq!(
            Board::from_fen("rnbqKbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").err(),
            Some(FenError::KingCount)
        );
    }

    #[test]
    fn test_too_many_pieces() {
        assert_eq!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/P7/PPPPPPPP/RNBQKBNR w KQkq - 0 1").err(),
            Some(FenError::TooManyPieces(33))
        );
    }

    #[test]
    fn test_rank_too_wide() {
        assert!(matches!(
            Board::from_fen("rnbqkbnr/ppppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(FenError::RankWidth(7))
        ));
    }

    #[test]
    fn test_invalid_piece() {
        assert_eq!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNX w KQkq - 0 1").err(),
            Some(FenError::InvalidPiece('X'))
        );
    }

    #[test]
    fn test_invalid_stm() {
        assert!(matches!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"),
            Err(FenError::InvalidSideToMove(_))
        ));
    }

    #[test]
    fn test_to_fen_round_trip() {
        let fens = [
            STARTPOS,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq c6 0 2",
        ];
        for fen in fens {
            assert_eq!(Board::from_fen(fen).unwrap().to_fen(), fen);
        }
    }

    #[test]
    fn test_placement_only_defaults() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/4K3 b").unwrap();
        assert_eq!(board.stm, Black);
        assert_eq!(board.hm, 0);
        assert_eq!(board.fm, 1);
    }
}
