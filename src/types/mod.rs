pub mod bitboard;
pub mod file;
pub mod piece;
pub mod rank;
pub mod side;
pub mod square;

pub use bitboard::Bitboard;
pub use file::File;
pub use piece::Piece;
pub use rank::Rank;
pub use side::Side;
pub use square::Square;
