//! Достижимость и прокладка коридоров
//!
//! Заливка идёт по четырём направлениям через проходимые клетки и использует
//! явный стек, так что глубина не зависит от размера сетки.

use rand::Rng;

use super::{CellGrid, Pos, RoomType, manhattan, neighbors4};

/// Маска клеток, достижимых из `start` (построчно, `y * size + x`)
pub fn flood_fill<G: CellGrid + ?Sized>(grid: &G, start: Pos) -> Vec<bool> {
    let size = grid.size();
    let mut reached = vec![false; size * size];
    fill_from(grid, start, &mut reached);
    reached
}

/// Дополняет маску `reached` клетками, достижимыми из `start`
///
/// Уже отмеченные клетки служат границей. Возвращает число новых клеток.
pub fn fill_from<G: CellGrid + ?Sized>(grid: &G, start: Pos, reached: &mut [bool]) -> usize {
    let size = grid.size();
    if start.0 >= size || start.1 >= size {
        return 0;
    }
    let start_idx = start.1 * size + start.0;
    if reached[start_idx] || !grid.get(start).is_traversable() {
        return 0;
    }

    reached[start_idx] = true;
    let mut added = 1;
    let mut stack = vec![start];

    while let Some(pos) = stack.pop() {
        for next in neighbors4(pos, size) {
            let idx = next.1 * size + next.0;
            if !reached[idx] && grid.get(next).is_traversable() {
                reached[idx] = true;
                added += 1;
                stack.push(next);
            }
        }
    }
    added
}

/// Все ли проходимые клетки достижимы от входа
pub fn is_fully_connected<G: CellGrid + ?Sized>(grid: &G) -> bool {
    let size = grid.size();
    let reached = flood_fill(grid, grid.entrance());
    for (i, &hit) in reached.iter().enumerate() {
        if !hit && grid.get((i % size, i / size)).is_traversable() {
            return false;
        }
    }
    true
}

/// Ближайшая по манхэттенскому расстоянию клетка, удовлетворяющая `accept`
///
/// Сетка просматривается построчно, при равенстве побеждает первая найденная.
pub fn nearest_cell(size: usize, from: Pos, accept: impl Fn(Pos) -> bool) -> Option<Pos> {
    let mut best: Option<(usize, Pos)> = None;
    for y in 0..size {
        for x in 0..size {
            let pos = (x, y);
            if !accept(pos) {
                continue;
            }
            let distance = manhattan(from, pos);
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, pos));
            }
        }
    }
    best.map(|(_, pos)| pos)
}

/// Прокладывает Г-образный коридор из `from` в `to`
///
/// Все клетки после `from` до `to` включительно становятся `Normal`, кроме
/// входа. Длина пути равна манхэттенскому расстоянию.
pub fn carve_corridor<G: CellGrid + ?Sized>(
    grid: &mut G,
    from: Pos,
    to: Pos,
    horizontal_first: bool,
) {
    let (mut x, mut y) = from;

    if horizontal_first {
        while x != to.0 {
            x = step_toward(x, to.0);
            dig(grid, (x, y));
        }
        while y != to.1 {
            y = step_toward(y, to.1);
            dig(grid, (x, y));
        }
    } else {
        while y != to.1 {
            y = step_toward(y, to.1);
            dig(grid, (x, y));
        }
        while x != to.0 {
            x = step_toward(x, to.0);
            dig(grid, (x, y));
        }
    }
}

fn step_toward(current: usize, target: usize) -> usize {
    if current < target {
        current + 1
    } else {
        current - 1
    }
}

fn dig<G: CellGrid + ?Sized>(grid: &mut G, pos: Pos) {
    if pos != grid.entrance() {
        grid.set(pos, RoomType::Normal);
    }
}

/// Соединяет все оторванные комнаты со связной частью подземелья
///
/// Для каждой проходимой клетки вне связной области коридор ведётся к
/// ближайшей связной клетке (направление первого колена выбирается монеткой),
/// затем заливка из этой клетки поглощает всё, что коридор соединил.
/// Возвращает число проложенных коридоров.
pub fn reconnect<G: CellGrid + ?Sized, R: Rng>(grid: &mut G, rng: &mut R) -> usize {
    let size = grid.size();
    let mut connected = flood_fill(grid, grid.entrance());
    let mut corridors = 0;

    for y in 0..size {
        for x in 0..size {
            let pos = (x, y);
            if connected[y * size + x] || !grid.get(pos).is_traversable() {
                continue;
            }
            let Some(target) = nearest_cell(size, pos, |p| connected[p.1 * size + p.0]) else {
                continue;
            };

            carve_corridor(grid, pos, target, rng.gen_bool(0.5));
            fill_from(grid, pos, &mut connected);
            corridors += 1;
        }
    }

    if corridors > 0 {
        tracing::debug!(corridors, "Проложены коридоры к оторванным комнатам");
    }
    corridors
}
