use rand::Rng;

use super::fitness::{self, Fitness};
use crate::config::FitnessWeights;
use crate::layout::connectivity::{carve_corridor, nearest_cell};
use crate::layout::{CellGrid, DungeonLayout, Pos, RoomType, neighbors4};

/// Возможные типы при мутации «смена типа»
const REASSIGNABLE: [RoomType; 3] = [RoomType::Normal, RoomType::Treasure, RoomType::Trap];

/// Особь: полная копия сетки и неизменный вход
///
/// В отличие от [`DungeonLayout`] не держит индекс по типам, поэтому
/// клонирование и скрещивание дешёвые.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    size: usize,
    grid: Vec<RoomType>,
    entrance: Pos,
    fitness: Fitness,
}

impl Individual {
    #[must_use]
    pub fn from_layout(layout: &DungeonLayout) -> Self {
        Self {
            size: layout.size(),
            grid: layout.cells().to_vec(),
            entrance: layout.entrance(),
            fitness: Fitness::default(),
        }
    }

    /// Скрещивание по строке `cut`: строки `[0, cut)` от первого родителя,
    /// `[cut, size)` от второго, вход от первого
    #[must_use]
    pub fn crossover(first: &Individual, second: &Individual, cut: usize) -> Self {
        let split = cut.min(first.size) * first.size;
        let mut grid = Vec::with_capacity(first.grid.len());
        grid.extend_from_slice(&first.grid[..split]);
        grid.extend_from_slice(&second.grid[split..]);
        Self {
            size: first.size,
            grid,
            entrance: first.entrance,
            fitness: Fitness::default(),
        }
    }

    #[must_use]
    pub fn grid(&self) -> &[RoomType] {
        &self.grid
    }

    #[must_use]
    pub fn fitness(&self) -> Fitness {
        self.fitness
    }

    /// Пересчитывает и запоминает приспособленность
    pub fn evaluate(&mut self, weights: &FitnessWeights) -> Fitness {
        self.fitness = fitness::evaluate(self, weights);
        self.fitness
    }

    /// Один проход мутации: `size / divisor` точечных изменений
    ///
    /// Каждое изменение выбирает случайную клетку (вход пропускается) и
    /// один из трёх операторов: переключение `Empty ↔ Normal`, смена типа
    /// комнаты или коридор от изолированной комнаты к ближайшей.
    pub fn mutate<R: Rng>(&mut self, divisor: usize, rng: &mut R) {
        let size = self.size;
        let mutations = size / divisor.max(1);

        for _ in 0..mutations {
            let pos = (rng.gen_range(0..size), rng.gen_range(0..size));
            if pos == self.entrance {
                continue;
            }
            let current = self.get(pos);

            match rng.gen_range(0..3) {
                0 => match current {
                    RoomType::Empty => self.set(pos, RoomType::Normal),
                    RoomType::Normal => self.set(pos, RoomType::Empty),
                    _ => {}
                },
                1 => {
                    if current.is_traversable() {
                        let next = REASSIGNABLE[rng.gen_range(0..REASSIGNABLE.len())];
                        self.set(pos, next);
                    }
                }
                _ => {
                    if current.is_traversable() && self.is_isolated(pos) {
                        self.connect_to_nearest(pos, rng);
                    }
                }
            }
        }
    }

    /// Нет ни одного непустого соседа по четырём направлениям
    fn is_isolated(&self, pos: Pos) -> bool {
        let mut around = neighbors4(pos, self.size);
        around.all(|n| !self.get(n).is_traversable())
    }

    fn connect_to_nearest<R: Rng>(&mut self, pos: Pos, rng: &mut R) {
        let open = |p: Pos| p != pos && self.get(p).is_traversable();
        let target = nearest_cell(self.size, pos, open);
        if let Some(target) = target {
            carve_corridor(self, pos, target, rng.gen_bool(0.5));
        }
    }

    /// Переносит сетку особи в раскладку, не трогая вход
    pub fn write_into(&self, layout: &mut DungeonLayout) {
        for (i, &room) in self.grid.iter().enumerate() {
            let pos = (i % self.size, i / self.size);
            if pos != self.entrance {
                layout.set_room_type(pos, room);
            }
        }
    }
}

impl CellGrid for Individual {
    fn size(&self) -> usize {
        self.size
    }

    fn entrance(&self) -> Pos {
        self.entrance
    }

    fn get(&self, pos: Pos) -> RoomType {
        if pos.0 < self.size && pos.1 < self.size {
            self.grid[pos.1 * self.size + pos.0]
        } else {
            RoomType::Empty
        }
    }

    fn set(&mut self, pos: Pos, room: RoomType) {
        if pos.0 < self.size && pos.1 < self.size && pos != self.entrance {
            self.grid[pos.1 * self.size + pos.0] = room;
        }
    }
}
