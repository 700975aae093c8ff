use std::fmt;
use std::ops::{Index, IndexMut};
use crate::types::{File, Rank};

#[derive(Copy, Clone, Eq, PartialEq, Default)]
#[repr(transparent)]
pub struct Square(pub u8);

impl Square {
    pub const COUNT: u8 = 64;

    #[inline(always)]
    pub const fn from(file: File, rank: Rank) -> Square {
        Square((rank as u8) << 3 | (file as u8))
    }

    #[inline(always)]
    pub const fn flip_rank(self) -> Square {
        Square(self.0 ^ 56)
    }

    #[inline(always)]
    pub const fn flip_file(self) -> Square {
        Square(self.0 ^ 7)
    }

    pub fn iter() -> impl Iterator<Item = Square> {
        (0..Self::COUNT).map(Square)
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = (b'a' + (self.0 & 7)) as char;
        let rank = (b'1' + (self.0 >> 3)) as char;
        write!(f, "{}{}", file, rank)
    }
}

impl<T, const N: usize> Index<Square> for [T; N] {
    type Output = T;

    fn index(&self, sq: Square) -> &Self::Output {
        &self[sq.0 as usize]
    }
}

impl<T, const N: usize> IndexMut<Square> for [T; N] {
    fn index_mut(&mut self, sq: Square) -> &mut Self::Output {
        &mut self[sq.0 as usize]
    }
}
