// src/cellular.rs
//! Клеточный автомат для вырезания комнат
//!
//! Вариант «Жизни» для пещер: случайное заполнение, несколько синхронных шагов
//! сглаживания, перенос в сетку и соединение оторванных комнат коридорами.

use rand::Rng;

use crate::config::CellularSettings;
use crate::layout::connectivity::reconnect;
use crate::layout::{DungeonLayout, RoomType};

#[derive(Debug, Clone, Default)]
pub struct CellularAutomata {
    settings: CellularSettings,
}

impl CellularAutomata {
    #[must_use]
    pub fn new(settings: CellularSettings) -> Self {
        Self { settings }
    }

    /// Превращает пустую сетку (кроме входа) в связный набор `Normal` комнат
    pub fn carve<R: Rng>(&self, layout: &mut DungeonLayout, rng: &mut R) {
        let size = layout.size();

        let mut map = self.seed_map(layout, rng);
        for _ in 0..self.settings.iterations {
            map = simulation_step(
                &map,
                size,
                self.settings.birth_limit,
                self.settings.death_limit,
            );
        }

        materialize(&map, layout);
        let filled = layout.traversable_count();
        let corridors = reconnect(layout, rng);

        tracing::debug!(
            size,
            filled,
            corridors,
            rooms = layout.traversable_count(),
            "Клеточный автомат завершён"
        );
    }

    /// Случайное начальное заполнение; окрестность входа заполнена всегда
    fn seed_map<R: Rng>(&self, layout: &DungeonLayout, rng: &mut R) -> Vec<bool> {
        let size = layout.size();
        let (ex, ey) = layout.entrance();
        let clearance = self.settings.entrance_clearance;

        (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                if x.abs_diff(ex) <= clearance && y.abs_diff(ey) <= clearance {
                    true
                } else {
                    rng.gen_range(0..100) < self.settings.initial_fill_percent
                }
            })
            .collect()
    }
}

/// Один синхронный шаг автомата
///
/// Каждая клетка считается по снимку `map` предыдущего шага. Соседи за
/// пределами сетки считаются заполненными. Заполненная клетка выживает при
/// `count >= death_limit`, пустая заполняется при `count > birth_limit`.
#[must_use]
pub fn simulation_step(
    map: &[bool],
    size: usize,
    birth_limit: usize,
    death_limit: usize,
) -> Vec<bool> {
    (0..size * size)
        .map(|i| {
            let count = filled_neighbors(map, size, i % size, i / size);
            if map[i] {
                count >= death_limit
            } else {
                count > birth_limit
            }
        })
        .collect()
}

fn filled_neighbors(map: &[bool], size: usize, x: usize, y: usize) -> usize {
    let mut count = 0;
    for dy in -1isize..=1 {
        for dx in -1isize..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x.checked_add_signed(dx).filter(|&v| v < size);
            let ny = y.checked_add_signed(dy).filter(|&v| v < size);
            match (nx, ny) {
                (Some(nx), Some(ny)) => count += usize::from(map[ny * size + nx]),
                // край карты работает как стена
                _ => count += 1,
            }
        }
    }
    count
}

fn materialize(map: &[bool], layout: &mut DungeonLayout) {
    let size = layout.size();
    let entrance = layout.entrance();
    for (i, &filled) in map.iter().enumerate() {
        let pos = (i % size, i / size);
        if pos == entrance {
            continue;
        }
        let room = if filled {
            RoomType::Normal
        } else {
            RoomType::Empty
        };
        layout.set_room_type(pos, room);
    }
}
