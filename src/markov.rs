// src/markov.rs
//! Марковская модель переходов типов комнат
//!
//! Каждая `Normal` клетка смотрит на самый частый тип среди восьми соседей
//! (по снимку сетки до прохода) и разыгрывает новый тип по строке переходов
//! этого соседа. После прохода добираются минимальные количества особых комнат.

use rand::Rng;

use crate::config::MarkovSettings;
use crate::layout::{DungeonLayout, Pos, RoomType, euclidean, neighbors8};

/// Один исход строки переходов
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub to: RoomType,
    pub probability: f64,
}

const fn transition(to: RoomType, probability: f64) -> Transition {
    Transition { to, probability }
}

/// Остаток вероятности до 1.0 означает «клетка не меняется».
const FROM_EMPTY: [Transition; 0] = [];
const FROM_NORMAL: [Transition; 4] = [
    transition(RoomType::Normal, 0.7),
    transition(RoomType::Treasure, 0.1),
    transition(RoomType::Trap, 0.15),
    transition(RoomType::Boss, 0.05),
];
const FROM_SPECIAL: [Transition; 1] = [transition(RoomType::Normal, 0.9)];

/// Строка переходов для типа соседа
#[must_use]
pub fn transition_row(neighbor: RoomType) -> &'static [Transition] {
    match neighbor {
        RoomType::Empty => &FROM_EMPTY,
        RoomType::Normal => &FROM_NORMAL,
        RoomType::Entrance | RoomType::Treasure | RoomType::Trap | RoomType::Boss => {
            &FROM_SPECIAL
        }
    }
}

/// Разыгрывает исход строки по равномерному `u ∈ [0, 1)`
#[must_use]
pub fn sample_row(row: &[Transition], u: f64) -> Option<RoomType> {
    let mut cumulative = 0.0;
    for t in row {
        cumulative += t.probability;
        if u < cumulative {
            return Some(t.to);
        }
    }
    None
}

#[derive(Debug, Clone, Default)]
pub struct MarkovChainModel {
    settings: MarkovSettings,
}

impl MarkovChainModel {
    #[must_use]
    pub fn new(settings: MarkovSettings) -> Self {
        Self { settings }
    }

    /// Марковский проход и добор особых комнат
    pub fn relax<R: Rng>(&self, layout: &mut DungeonLayout, rng: &mut R) {
        let changed = self.transition_pass(layout, rng);
        self.top_up(layout, rng);

        tracing::debug!(
            changed,
            treasure = layout.count(RoomType::Treasure),
            traps = layout.count(RoomType::Trap),
            bosses = layout.count(RoomType::Boss),
            "Марковский проход завершён"
        );
    }

    /// Проход по снимку сетки; возвращает число клеток, сменивших тип
    fn transition_pass<R: Rng>(&self, layout: &mut DungeonLayout, rng: &mut R) -> usize {
        let size = layout.size();
        let snapshot = layout.cells().to_vec();
        let mut changed = 0;

        for (i, &room) in snapshot.iter().enumerate() {
            if room != RoomType::Normal {
                continue;
            }
            let pos = (i % size, i / size);
            let neighbor = dominant_neighbor(&snapshot, size, pos);
            let u = rng.gen_range(0.0..1.0);
            if let Some(next) = sample_row(transition_row(neighbor), u) {
                // переход в Empty невозможен: строки его не содержат
                if next != room && layout.set_room_type(pos, next) {
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Добор: босс, сокровищницы и ловушки, если их нет совсем
    fn top_up<R: Rng>(&self, layout: &mut DungeonLayout, rng: &mut R) {
        let size = layout.size();
        let attempts = self.settings.probe_attempts;

        if layout.count(RoomType::Boss) == 0 {
            if let Some(far) = farthest_normal(layout) {
                layout.set_room_type(far, RoomType::Boss);
            }
        }

        if layout.count(RoomType::Treasure) == 0 {
            let share = size / self.settings.treasure_divisor.max(1);
            let target = self.settings.min_treasure.max(share);
            convert_normals(layout, RoomType::Treasure, target, attempts, rng);
        }

        if layout.count(RoomType::Trap) == 0 {
            let share = size / self.settings.trap_divisor.max(1);
            let target = self.settings.min_traps.max(share);
            convert_normals(layout, RoomType::Trap, target, attempts, rng);
        }
    }
}

/// Превращает до `count` случайных клеток `Normal` в `room`
fn convert_normals<R: Rng>(
    layout: &mut DungeonLayout,
    room: RoomType,
    count: usize,
    attempts: usize,
    rng: &mut R,
) {
    let size = layout.size();
    let mut remaining = count;
    for _ in 0..attempts {
        if remaining == 0 {
            break;
        }
        let pos = (rng.gen_range(0..size), rng.gen_range(0..size));
        if layout.room_type(pos.0, pos.1) == RoomType::Normal {
            layout.set_room_type(pos, room);
            remaining -= 1;
        }
    }
}

/// Самый частый тип среди соседей; при равенстве побеждает встреченный первым
fn dominant_neighbor(snapshot: &[RoomType], size: usize, pos: Pos) -> RoomType {
    let mut tally: Vec<(RoomType, usize)> = Vec::with_capacity(8);
    for (x, y) in neighbors8(pos, size) {
        let room = snapshot[y * size + x];
        match tally.iter_mut().find(|(r, _)| *r == room) {
            Some((_, count)) => *count += 1,
            None => tally.push((room, 1)),
        }
    }

    let mut best = (RoomType::Normal, 0);
    for (room, count) in tally {
        if count > best.1 {
            best = (room, count);
        }
    }
    best.0
}

/// `Normal` клетка с наибольшим евклидовым расстоянием от входа
pub(crate) fn farthest_normal(layout: &DungeonLayout) -> Option<Pos> {
    let entrance = layout.entrance();
    let mut best: Option<(f64, Pos)> = None;
    for &pos in layout.room_positions(RoomType::Normal) {
        let distance = euclidean(pos, entrance);
        if best.is_none_or(|(d, _)| distance > d) {
            best = Some((distance, pos));
        }
    }
    best.map(|(_, pos)| pos)
}
