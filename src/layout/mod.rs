//! Модель сетки подземелья
//!
//! Сетка `size × size` из клеток [`RoomType`], единственная точка входа и
//! индекс позиций по типам. Все алгоритмы генерации работают через
//! изменение типов клеток; общие для них операции (заливка, коридоры)
//! описаны один раз поверх трейта [`CellGrid`].

pub mod connectivity;
pub mod grid;
pub mod room_type;

pub use grid::DungeonLayout;
pub use room_type::RoomType;

/// Координаты клетки `(x, y)`
pub type Pos = (usize, usize);

/// Минимальный интерфейс квадратной сетки с фиксированным входом
///
/// Реализуется [`DungeonLayout`] и особями генетического оптимизатора,
/// чтобы заливка и прокладка коридоров были общими.
pub trait CellGrid {
    fn size(&self) -> usize;

    fn entrance(&self) -> Pos;

    /// Тип клетки; за пределами сетки всегда `Empty`
    fn get(&self, pos: Pos) -> RoomType;

    /// Записывает тип клетки. Вход и выход за границы игнорируются.
    fn set(&mut self, pos: Pos, room: RoomType);
}

/// Соседи по четырём направлениям в пределах сетки
pub fn neighbors4(pos: Pos, size: usize) -> impl Iterator<Item = Pos> {
    const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
    DIRECTIONS
        .into_iter()
        .filter_map(move |(dx, dy)| offset(pos, dx, dy, size))
}

/// Соседи по восьми направлениям в пределах сетки (без самой клетки),
/// построчно: сначала верхний ряд слева направо
pub fn neighbors8(pos: Pos, size: usize) -> impl Iterator<Item = Pos> {
    (-1isize..=1)
        .flat_map(|dy| (-1isize..=1).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .filter_map(move |(dx, dy)| offset(pos, dx, dy, size))
}

fn offset(pos: Pos, dx: isize, dy: isize, size: usize) -> Option<Pos> {
    let x = pos.0.checked_add_signed(dx)?;
    let y = pos.1.checked_add_signed(dy)?;
    (x < size && y < size).then_some((x, y))
}

#[must_use]
pub fn manhattan(a: Pos, b: Pos) -> usize {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}

#[must_use]
pub fn euclidean(a: Pos, b: Pos) -> f64 {
    let dx = a.0.abs_diff(b.0) as f64;
    let dy = a.1.abs_diff(b.1) as f64;
    (dx * dx + dy * dy).sqrt()
}
