//! Функция приспособленности раскладки
//!
//! Взвешенная сумма четырёх оценок, каждая в диапазоне `[0, 1]`:
//! связность, распределение типов комнат, разнообразие форм и сложность.

use std::collections::HashSet;

use crate::config::FitnessWeights;
use crate::layout::connectivity::flood_fill;
use crate::layout::{CellGrid, Pos, RoomType, euclidean, neighbors4};

/// Разложение приспособленности по слагаемым
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Fitness {
    pub connectivity: f64,
    pub distribution: f64,
    pub aesthetics: f64,
    pub challenge: f64,
    /// Взвешенная сумма
    pub total: f64,
}

pub fn evaluate<G: CellGrid + ?Sized>(grid: &G, weights: &FitnessWeights) -> Fitness {
    let connectivity = connectivity(grid);
    let distribution = distribution(grid);
    let aesthetics = aesthetics(grid);
    let challenge = challenge(grid);

    Fitness {
        connectivity,
        distribution,
        aesthetics,
        challenge,
        total: connectivity * weights.connectivity
            + distribution * weights.distribution
            + aesthetics * weights.aesthetics
            + challenge * weights.challenge,
    }
}

fn cells<G: CellGrid + ?Sized>(grid: &G) -> impl Iterator<Item = (Pos, RoomType)> + '_ {
    let size = grid.size();
    (0..size * size).map(move |i| {
        let pos = (i % size, i / size);
        (pos, grid.get(pos))
    })
}

/// Доля непустых клеток, достижимых от входа
pub fn connectivity<G: CellGrid + ?Sized>(grid: &G) -> f64 {
    let total = cells(grid)
        .filter(|(_, room)| room.is_traversable())
        .count();
    if total == 0 {
        return 0.0;
    }
    let reachable = flood_fill(grid, grid.entrance())
        .iter()
        .filter(|&&r| r)
        .count();
    reachable as f64 / total as f64
}

/// Близость числа сокровищниц, ловушек и боссов к идеалу
pub fn distribution<G: CellGrid + ?Sized>(grid: &G) -> f64 {
    let mut counts = [0usize; 6];
    for (_, room) in cells(grid) {
        counts[room.index()] += 1;
    }
    let treasure = counts[RoomType::Treasure.index()];
    let traps = counts[RoomType::Trap.index()];
    let bosses = counts[RoomType::Boss.index()];

    // вход учитывается отдельной единицей
    let total = counts[RoomType::Normal.index()] + treasure + traps + bosses + 1;
    if total <= 1 {
        return 0.0;
    }

    let treasure_score = closeness(treasure, (total / 10).max(1));
    let trap_score = closeness(traps, (total / 8).max(1));
    let boss_score = if bosses == 1 { 1.0 } else { 0.0 };

    treasure_score * 0.4 + trap_score * 0.3 + boss_score * 0.3
}

fn closeness(actual: usize, ideal: usize) -> f64 {
    let deviation = actual.abs_diff(ideal) as f64 / ideal as f64;
    (1.0 - deviation).clamp(0.0, 1.0)
}

/// Число различных форм связных кластеров против идеала `size / 5`
pub fn aesthetics<G: CellGrid + ?Sized>(grid: &G) -> f64 {
    let shapes = count_cluster_shapes(grid);
    let ideal = (grid.size() / 5).max(1);
    closeness(shapes, ideal)
}

/// Число различных форм кластеров
///
/// Форма кластера: отсортированный набор смещений его клеток относительно
/// первой клетки кластера в построчном порядке.
pub fn count_cluster_shapes<G: CellGrid + ?Sized>(grid: &G) -> usize {
    let size = grid.size();
    let mut visited = vec![false; size * size];
    let mut shapes: HashSet<Vec<(isize, isize)>> = HashSet::new();

    for (origin, room) in cells(grid) {
        let idx = origin.1 * size + origin.0;
        if visited[idx] || !room.is_traversable() {
            continue;
        }

        visited[idx] = true;
        let mut stack = vec![origin];
        let mut signature = Vec::new();
        while let Some(pos) = stack.pop() {
            signature.push((
                pos.0 as isize - origin.0 as isize,
                pos.1 as isize - origin.1 as isize,
            ));
            for next in neighbors4(pos, size) {
                let n = next.1 * size + next.0;
                if !visited[n] && grid.get(next).is_traversable() {
                    visited[n] = true;
                    stack.push(next);
                }
            }
        }
        signature.sort_unstable();
        shapes.insert(signature);
    }
    shapes.len()
}

/// Сложность: удалённость босса и рост числа ловушек с расстоянием
pub fn challenge<G: CellGrid + ?Sized>(grid: &G) -> f64 {
    boss_distance_score(grid) * 0.6 + trap_spread_score(grid) * 0.4
}

/// Близость расстояния до первого босса к `0.7 · size`
fn boss_distance_score<G: CellGrid + ?Sized>(grid: &G) -> f64 {
    let Some((boss, _)) = cells(grid).find(|&(_, room)| room == RoomType::Boss) else {
        return 0.0;
    };
    let ideal = grid.size() as f64 * 0.7;
    let distance = euclidean(boss, grid.entrance());
    (1.0 - (distance - ideal).abs() / ideal).clamp(0.0, 1.0)
}

/// Насколько распределение ловушек по расстоянию следует растущему идеалу
fn trap_spread_score<G: CellGrid + ?Sized>(grid: &G) -> f64 {
    let size = grid.size();
    let entrance = grid.entrance();
    let mut by_distance = vec![0usize; size];

    for (pos, room) in cells(grid) {
        if room != RoomType::Trap {
            continue;
        }
        let ring = euclidean(pos, entrance) as usize;
        if ring < size {
            by_distance[ring] += 1;
        }
    }

    let total: usize = by_distance.iter().sum();
    if total == 0 {
        return 0.0;
    }

    let deviation: f64 = by_distance
        .iter()
        .enumerate()
        .map(|(ring, &count)| {
            let ideal = ring as f64 / size as f64;
            let actual = count as f64 / total as f64;
            (actual - ideal).abs() * ideal
        })
        .sum();

    1.0 - deviation.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::DungeonLayout;
    use rstest::rstest;

    fn layout_with(size: usize, rooms: &[(Pos, RoomType)]) -> DungeonLayout {
        let mut layout = DungeonLayout::with_centered_entrance(size).unwrap();
        for &(pos, room) in rooms {
            layout.set_room_type(pos, room);
        }
        layout
    }

    #[test]
    fn connectivity_is_reachable_share() {
        let layout = layout_with(
            5,
            &[((1, 2), RoomType::Normal), ((0, 0), RoomType::Normal)],
        );
        // вход и (1,2) достижимы, (0,0) нет
        assert!((connectivity(&layout) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn distribution_rewards_single_boss_and_ideal_counts() {
        // 9 непустых + вход = 10: идеал 1 сокровищница, 1 ловушка
        let mut rooms: Vec<(Pos, RoomType)> = Vec::new();
        for x in 0..6 {
            rooms.push(((x, 0), RoomType::Normal));
        }
        rooms.push(((6, 0), RoomType::Treasure));
        rooms.push(((7, 0), RoomType::Trap));
        rooms.push(((8, 0), RoomType::Boss));
        let layout = layout_with(10, &rooms);
        assert!((distribution(&layout) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn distribution_scores_are_clamped() {
        // 20 ловушек при идеале 2: штраф не уходит в минус
        let rooms: Vec<(Pos, RoomType)> = (0..20)
            .map(|i| ((i % 10, i / 10), RoomType::Trap))
            .collect();
        let layout = layout_with(10, &rooms);
        let score = distribution(&layout);
        assert!((0.0..=1.0).contains(&score));
        assert!(score.abs() < 1e-12);
    }

    #[test]
    fn entrance_only_grid_has_zero_distribution() {
        let layout = layout_with(5, &[]);
        assert!(distribution(&layout).abs() < f64::EPSILON);
    }

    #[test]
    fn identical_clusters_share_one_shape() {
        let layout = layout_with(
            10,
            &[
                ((0, 0), RoomType::Normal),
                ((1, 0), RoomType::Normal),
                ((0, 8), RoomType::Trap),
                ((1, 8), RoomType::Normal),
                ((8, 0), RoomType::Normal),
                ((8, 1), RoomType::Normal),
            ],
        );
        // две горизонтальные пары, одна вертикальная, одиночный вход
        assert_eq!(count_cluster_shapes(&layout), 3);
    }

    #[rstest]
    #[case(5)]
    #[case(10)]
    #[case(25)]
    fn all_terms_stay_in_unit_range(#[case] size: usize) {
        let rooms: Vec<(Pos, RoomType)> = (0..size)
            .flat_map(|y| (0..size).map(move |x| (x, y)))
            .filter(|&(x, y)| (x + y) % 3 != 0)
            .map(|pos| {
                let room = match (pos.0 * 7 + pos.1) % 5 {
                    0 => RoomType::Trap,
                    1 => RoomType::Treasure,
                    _ => RoomType::Normal,
                };
                (pos, room)
            })
            .collect();
        let layout = layout_with(size, &rooms);
        let fitness = evaluate(&layout, &FitnessWeights::default());
        for term in [
            fitness.connectivity,
            fitness.distribution,
            fitness.aesthetics,
            fitness.challenge,
            fitness.total,
        ] {
            assert!((0.0..=1.0).contains(&term), "{fitness:?}");
        }
    }

    #[test]
    fn boss_near_ideal_distance_scores_higher() {
        // вход (10,10), идеал 0.7 * 20 = 14
        let near = layout_with(20, &[((10, 11), RoomType::Boss)]);
        let far = layout_with(20, &[((0, 0), RoomType::Boss)]);
        let empty = layout_with(20, &[]);
        assert!(boss_distance_score(&far) > boss_distance_score(&near));
        assert!(boss_distance_score(&empty).abs() < f64::EPSILON);
    }

    #[test]
    fn distant_traps_beat_traps_at_the_door() {
        // вход (2,2): ловушка у двери в кольце 1 даёт 0.0, в углу (кольцо 2) 0.125
        let door = layout_with(4, &[((2, 3), RoomType::Trap)]);
        let corner = layout_with(4, &[((0, 0), RoomType::Trap)]);
        assert!(trap_spread_score(&door).abs() < 1e-12);
        assert!((trap_spread_score(&corner) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn trap_spread_is_zero_without_traps() {
        let layout = layout_with(10, &[]);
        assert!(trap_spread_score(&layout).abs() < f64::EPSILON);
    }

    #[test]
    fn weights_combine_terms() {
        let layout = layout_with(10, &[((4, 5), RoomType::Normal), ((3, 5), RoomType::Boss)]);
        let only_connectivity = FitnessWeights {
            connectivity: 1.0,
            distribution: 0.0,
            aesthetics: 0.0,
            challenge: 0.0,
        };
        let fitness = evaluate(&layout, &only_connectivity);
        assert!((fitness.total - fitness.connectivity).abs() < 1e-12);
        assert!((fitness.connectivity - 1.0).abs() < 1e-12);
    }
}
