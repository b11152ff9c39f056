use std::collections::BTreeSet;
use std::fmt;

use super::connectivity::flood_fill;
use super::{CellGrid, Pos, RoomType};
use crate::error::LayoutError;

/// Сетка подземелья с индексом позиций по типам
///
/// Клетки хранятся построчно (`y * size + x`). Индекс `positions` обновляется
/// только внутри [`DungeonLayout::set_room_type`], поэтому всегда совпадает
/// с содержимым сетки.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DungeonLayout {
    size: usize,
    cells: Vec<RoomType>,
    entrance: Pos,
    positions: [BTreeSet<Pos>; 6],
}

impl DungeonLayout {
    /// Создаёт пустую сетку `size × size` со входом в `entrance`
    ///
    /// # Ошибки
    /// - [`LayoutError::InvalidSize`], если `size == 0`
    /// - [`LayoutError::EntranceOutOfBounds`], если вход вне сетки
    pub fn new(size: usize, entrance: Pos) -> Result<Self, LayoutError> {
        if size == 0 {
            return Err(LayoutError::InvalidSize { size });
        }
        if entrance.0 >= size || entrance.1 >= size {
            return Err(LayoutError::EntranceOutOfBounds {
                x: entrance.0,
                y: entrance.1,
                size,
            });
        }

        let mut positions: [BTreeSet<Pos>; 6] = Default::default();
        positions[RoomType::Empty.index()] = (0..size)
            .flat_map(|y| (0..size).map(move |x| (x, y)))
            .filter(|&pos| pos != entrance)
            .collect();
        positions[RoomType::Entrance.index()].insert(entrance);

        let mut cells = vec![RoomType::Empty; size * size];
        cells[entrance.1 * size + entrance.0] = RoomType::Entrance;

        Ok(Self {
            size,
            cells,
            entrance,
            positions,
        })
    }

    /// Пустая сетка со входом в центре `(size/2, size/2)`
    pub fn with_centered_entrance(size: usize) -> Result<Self, LayoutError> {
        Self::new(size, (size / 2, size / 2))
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn entrance(&self) -> Pos {
        self.entrance
    }

    #[must_use]
    pub fn entrance_x(&self) -> usize {
        self.entrance.0
    }

    #[must_use]
    pub fn entrance_y(&self) -> usize {
        self.entrance.1
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        if pos.0 < self.size && pos.1 < self.size {
            Some(pos.1 * self.size + pos.0)
        } else {
            None
        }
    }

    /// Тип клетки; за пределами сетки `Empty`
    #[must_use]
    pub fn room_type(&self, x: usize, y: usize) -> RoomType {
        match self.index((x, y)) {
            Some(i) => self.cells[i],
            None => RoomType::Empty,
        }
    }

    /// Есть ли в клетке комната (любой тип, кроме `Empty`)
    #[must_use]
    pub fn is_room(&self, x: usize, y: usize) -> bool {
        self.room_type(x, y).is_traversable()
    }

    /// Все клетки данного типа в порядке `(x, y)`
    #[must_use]
    pub fn room_positions(&self, room: RoomType) -> &BTreeSet<Pos> {
        &self.positions[room.index()]
    }

    #[must_use]
    pub fn count(&self, room: RoomType) -> usize {
        self.positions[room.index()].len()
    }

    #[must_use]
    pub fn traversable_count(&self) -> usize {
        self.cells.len() - self.count(RoomType::Empty)
    }

    /// Клетки построчно, `y * size + x`
    #[must_use]
    pub fn cells(&self) -> &[RoomType] {
        &self.cells
    }

    /// Единственный способ изменить клетку
    ///
    /// Отклоняет запись за пределы сетки, любую запись во вход и установку
    /// `Entrance` в другую клетку. Возвращает `true`, если после вызова
    /// клетка имеет запрошенный тип.
    pub fn set_room_type(&mut self, pos: Pos, room: RoomType) -> bool {
        let Some(idx) = self.index(pos) else {
            return false;
        };
        if pos == self.entrance {
            return room == RoomType::Entrance;
        }
        if room == RoomType::Entrance {
            return false;
        }

        let old = self.cells[idx];
        if old != room {
            self.positions[old.index()].remove(&pos);
            self.positions[room.index()].insert(pos);
            self.cells[idx] = room;
        }
        true
    }

    /// Проверяет инварианты сетки
    ///
    /// Вход единственный и на месте, индекс совпадает с сеткой, все проходимые
    /// клетки достижимы от входа.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let (ex, ey) = self.entrance;
        let at_entrance = self.cells[ey * self.size + ex];
        if at_entrance != RoomType::Entrance || self.count(RoomType::Entrance) != 1 {
            return Err(LayoutError::EntranceMismatch { x: ex, y: ey });
        }

        let indexed: usize = self.positions.iter().map(BTreeSet::len).sum();
        for (i, &room) in self.cells.iter().enumerate() {
            let (x, y) = (i % self.size, i / self.size);
            if !self.positions[room.index()].contains(&(x, y)) {
                return Err(LayoutError::IndexMismatch { room, x, y });
            }
        }
        if indexed != self.cells.len() {
            // лишняя запись в индексе: ищем её для отчёта
            for room in RoomType::ALL {
                if let Some(&(x, y)) = self.positions[room.index()]
                    .iter()
                    .find(|&&(x, y)| self.room_type(x, y) != room)
                {
                    return Err(LayoutError::IndexMismatch { room, x, y });
                }
            }
        }

        let reached = flood_fill(self, self.entrance);
        let unreachable: Vec<Pos> = self
            .cells
            .iter()
            .enumerate()
            .filter(|&(i, room)| room.is_traversable() && !reached[i])
            .map(|(i, _)| (i % self.size, i / self.size))
            .collect();
        if unreachable.is_empty() {
            Ok(())
        } else {
            Err(LayoutError::Disconnected { unreachable })
        }
    }
}

impl CellGrid for DungeonLayout {
    fn size(&self) -> usize {
        self.size
    }

    fn entrance(&self) -> Pos {
        self.entrance
    }

    fn get(&self, pos: Pos) -> RoomType {
        self.room_type(pos.0, pos.1)
    }

    fn set(&mut self, pos: Pos, room: RoomType) {
        self.set_room_type(pos, room);
    }
}

/// Текстовый предпросмотр: одна строка сетки на строку вывода
impl fmt::Display for DungeonLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.size) {
            let line: String = row.iter().map(|room| room.glyph()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_is_rejected() {
        assert_eq!(
            DungeonLayout::new(0, (0, 0)),
            Err(LayoutError::InvalidSize { size: 0 })
        );
    }

    #[test]
    fn entrance_outside_grid_is_rejected() {
        assert!(matches!(
            DungeonLayout::new(4, (4, 1)),
            Err(LayoutError::EntranceOutOfBounds { x: 4, y: 1, size: 4 })
        ));
    }

    #[test]
    fn fresh_layout_is_empty_except_entrance() {
        let layout = DungeonLayout::with_centered_entrance(5).unwrap();
        assert_eq!(layout.entrance(), (2, 2));
        assert_eq!(layout.room_type(2, 2), RoomType::Entrance);
        assert_eq!(layout.count(RoomType::Empty), 24);
        assert_eq!(layout.traversable_count(), 1);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn index_follows_every_assignment() {
        let mut layout = DungeonLayout::with_centered_entrance(5).unwrap();
        assert!(layout.set_room_type((1, 2), RoomType::Normal));
        assert!(layout.set_room_type((1, 2), RoomType::Trap));
        assert!(!layout.room_positions(RoomType::Normal).contains(&(1, 2)));
        assert!(layout.room_positions(RoomType::Trap).contains(&(1, 2)));
        assert!(!layout.room_positions(RoomType::Empty).contains(&(1, 2)));
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn entrance_cannot_be_overwritten_or_duplicated() {
        let mut layout = DungeonLayout::with_centered_entrance(5).unwrap();
        assert!(!layout.set_room_type((2, 2), RoomType::Normal));
        assert!(!layout.set_room_type((0, 0), RoomType::Entrance));
        assert_eq!(layout.room_type(2, 2), RoomType::Entrance);
        assert_eq!(layout.count(RoomType::Entrance), 1);
    }

    #[test]
    fn out_of_bounds_reads_empty_and_writes_are_ignored() {
        let mut layout = DungeonLayout::with_centered_entrance(3).unwrap();
        assert_eq!(layout.room_type(7, 0), RoomType::Empty);
        assert!(!layout.is_room(0, 9));
        assert!(!layout.set_room_type((3, 0), RoomType::Normal));
    }

    #[test]
    fn isolated_room_fails_validation() {
        let mut layout = DungeonLayout::with_centered_entrance(5).unwrap();
        layout.set_room_type((0, 0), RoomType::Normal);
        assert_eq!(
            layout.validate(),
            Err(LayoutError::Disconnected {
                unreachable: vec![(0, 0)]
            })
        );
    }

    #[test]
    fn display_renders_one_line_per_row() {
        let mut layout = DungeonLayout::with_centered_entrance(3).unwrap();
        layout.set_room_type((0, 1), RoomType::Normal);
        layout.set_room_type((2, 1), RoomType::Boss);
        assert_eq!(layout.to_string(), "###\n.EB\n###\n");
    }
}
