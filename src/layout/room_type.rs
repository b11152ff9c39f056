/// Тип клетки подземелья
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum RoomType {
    /// Пустота: стена или скала, по ней нельзя пройти
    #[default]
    Empty,
    Normal,
    /// Вход, в сетке ровно один
    Entrance,
    Treasure,
    Trap,
    Boss,
}

impl RoomType {
    pub const ALL: [RoomType; 6] = [
        RoomType::Empty,
        RoomType::Normal,
        RoomType::Entrance,
        RoomType::Treasure,
        RoomType::Trap,
        RoomType::Boss,
    ];

    /// Порядковый номер варианта, используется как индекс в таблицах по типам
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            RoomType::Empty => 0,
            RoomType::Normal => 1,
            RoomType::Entrance => 2,
            RoomType::Treasure => 3,
            RoomType::Trap => 4,
            RoomType::Boss => 5,
        }
    }

    /// Можно ли пройти через клетку (всё, кроме `Empty`)
    #[must_use]
    pub const fn is_traversable(self) -> bool {
        !matches!(self, RoomType::Empty)
    }

    /// Особая комната: сокровищница, ловушка, босс или вход
    #[must_use]
    pub const fn is_special(self) -> bool {
        matches!(
            self,
            RoomType::Treasure | RoomType::Trap | RoomType::Boss | RoomType::Entrance
        )
    }

    /// Символ для текстового предпросмотра
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            RoomType::Empty => '#',
            RoomType::Normal => '.',
            RoomType::Entrance => 'E',
            RoomType::Treasure => '$',
            RoomType::Trap => '^',
            RoomType::Boss => 'B',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RoomType::Empty, false, false)]
    #[case(RoomType::Normal, true, false)]
    #[case(RoomType::Entrance, true, true)]
    #[case(RoomType::Treasure, true, true)]
    #[case(RoomType::Trap, true, true)]
    #[case(RoomType::Boss, true, true)]
    fn predicates(#[case] room: RoomType, #[case] traversable: bool, #[case] special: bool) {
        assert_eq!(room.is_traversable(), traversable);
        assert_eq!(room.is_special(), special);
    }

    #[test]
    fn index_matches_position_in_all() {
        for (i, room) in RoomType::ALL.iter().enumerate() {
            assert_eq!(room.index(), i);
        }
    }

    #[test]
    fn glyphs_are_distinct() {
        let mut glyphs: Vec<char> = RoomType::ALL.iter().map(|r| r.glyph()).collect();
        glyphs.sort_unstable();
        glyphs.dedup();
        assert_eq!(glyphs.len(), RoomType::ALL.len());
    }
}
