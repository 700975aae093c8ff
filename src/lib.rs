pub mod board;
pub mod evaluation;
pub mod score;
pub mod types;
pub mod utils;
pub mod wdl;
