use crate::types::square::Square;

#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum File {
    A, B, C, D, E, F, G, H
}

impl File {
    pub fn parse(file: usize) -> File {
        match file {
            0 => File::A,
            1 => File::B,
            2 => File::C,
            3 => File::D,
            4 => File::E,
            5 => File::F,
            6 => File::G,
            7 => File::H,
            _ => panic!("Invalid file index: {}", file),
        }
    }

    pub fn of(sq: Square) -> File {
        File::parse((sq.0 & 7) as usize)
    }
}
