// src/generator.rs
//! Конвейер генерации подземелья
//!
//! Порядок стадий фиксирован: клеточный автомат, марковский проход,
//! генетическая оптимизация, финальная расстановка босса, сокровищниц и
//! ловушек. Вся случайность идёт из одного генератора, поэтому при
//! одинаковом сиде результат побайтно совпадает.

use std::thread::{self, JoinHandle};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::cellular::CellularAutomata;
use crate::config::{FeatureSettings, GenerationParams};
use crate::error::{GenerationError, LayoutError};
use crate::genetic::GeneticOptimizer;
use crate::layout::{DungeonLayout, Pos, RoomType, euclidean};
use crate::markov::{MarkovChainModel, farthest_normal};

/// Генератор подземелий с собственным источником случайности
#[derive(Debug, Clone)]
pub struct DungeonGenerator<R: Rng> {
    params: GenerationParams,
    rng: R,
}

impl DungeonGenerator<ChaCha8Rng> {
    /// Детерминированный генератор с явным сидом
    #[must_use]
    pub fn from_seed(params: GenerationParams, seed: u64) -> Self {
        Self::new(params, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Детерминированный генератор с сидом из параметров
    #[must_use]
    pub fn from_params(params: GenerationParams) -> Self {
        let seed = params.seed;
        Self::from_seed(params, seed)
    }
}

impl<R: Rng> DungeonGenerator<R> {
    #[must_use]
    pub fn new(params: GenerationParams, rng: R) -> Self {
        Self { params, rng }
    }

    #[must_use]
    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Генерирует подземелье случайного размера из трёх градаций
    pub fn generate(&mut self) -> Result<DungeonLayout, LayoutError> {
        let size = self.params.sizes.pick(self.rng.gen_range(0.0..1.0));
        self.generate_sized(size)
    }

    /// Генерирует подземелье заданного размера
    ///
    /// # Ошибки
    /// [`LayoutError::InvalidSize`] при `size == 0`.
    pub fn generate_sized(&mut self, size: usize) -> Result<DungeonLayout, LayoutError> {
        let mut layout = DungeonLayout::with_centered_entrance(size)?;
        let rounds = self.params.evolutionary_rounds;

        let carver = CellularAutomata::new(self.params.cellular.clone());
        carver.carve(&mut layout, &mut self.rng);
        let relaxer = MarkovChainModel::new(self.params.markov.clone());
        relaxer.relax(&mut layout, &mut self.rng);
        let optimizer = GeneticOptimizer::new(self.params.genetic.clone());
        let report = optimizer.optimize(&mut layout, rounds, &mut self.rng);
        place_features(&mut layout, &self.params.features, &mut self.rng);

        tracing::info!(
            size,
            rounds,
            fitness = report.best.total,
            rooms = layout.traversable_count(),
            treasure = layout.count(RoomType::Treasure),
            traps = layout.count(RoomType::Trap),
            bosses = layout.count(RoomType::Boss),
            "Подземелье сгенерировано"
        );
        Ok(layout)
    }
}

/// Финальная расстановка особых комнат
///
/// Сначала все `Boss`, `Treasure` и `Trap` возвращаются в `Normal`, затем
/// ставятся ровно один босс в самой дальней комнате, сокровищницы и ловушки
/// вдали от входа. Пробы ограничены, запасного пути нет: при неудаче
/// комнат окажется меньше целевого числа.
pub fn place_features<R: Rng>(
    layout: &mut DungeonLayout,
    settings: &FeatureSettings,
    rng: &mut R,
) {
    let size = layout.size();

    let specials: Vec<_> = [RoomType::Boss, RoomType::Treasure, RoomType::Trap]
        .into_iter()
        .flat_map(|room| layout.room_positions(room).iter().copied())
        .collect();
    for pos in specials {
        layout.set_room_type(pos, RoomType::Normal);
    }

    if let Some(far) = farthest_normal(layout) {
        layout.set_room_type(far, RoomType::Boss);
    }

    let treasures = settings
        .min_treasure
        .max(size / settings.treasure_divisor.max(1));
    let placed_treasure = place_on_normals(
        layout,
        RoomType::Treasure,
        treasures,
        settings.probe_attempts,
        rng,
        |_| true,
    );

    let traps = settings.min_traps.max(size / settings.trap_divisor.max(1));
    let min_distance = (size / settings.trap_distance_divisor.max(1)) as f64;
    let entrance = layout.entrance();
    let placed_traps = place_on_normals(
        layout,
        RoomType::Trap,
        traps,
        settings.probe_attempts,
        rng,
        |pos| euclidean(pos, entrance) > min_distance,
    );

    tracing::debug!(
        treasures,
        placed_treasure,
        traps,
        placed_traps,
        "Особые комнаты расставлены"
    );
}

/// Пробует случайные клетки и превращает подходящие `Normal` в `room`
fn place_on_normals<R: Rng>(
    layout: &mut DungeonLayout,
    room: RoomType,
    target: usize,
    attempts: usize,
    rng: &mut R,
    accept: impl Fn(Pos) -> bool,
) -> usize {
    let size = layout.size();
    let mut placed = 0;
    for _ in 0..attempts {
        if placed == target {
            break;
        }
        let pos = (rng.gen_range(0..size), rng.gen_range(0..size));
        if layout.room_type(pos.0, pos.1) == RoomType::Normal && accept(pos) {
            layout.set_room_type(pos, room);
            placed += 1;
        }
    }
    placed
}

/// Независимые генерации по списку сидов; порядок результатов совпадает с сидами
///
/// С фичей `parallel` генерации идут в пуле из `max_concurrent` потоков.
///
/// # Ошибки
/// [`GenerationError::ThreadPool`], если пул не удалось создать. Ошибки
/// отдельных генераций возвращаются во внутреннем `Result`.
#[cfg(feature = "parallel")]
pub fn generate_batch(
    params: &GenerationParams,
    seeds: &[u64],
) -> Result<Vec<Result<DungeonLayout, LayoutError>>, GenerationError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.max_concurrent.max(1))
        .build()?;

    tracing::debug!(
        count = seeds.len(),
        threads = pool.current_num_threads(),
        "Пакетная генерация"
    );
    Ok(pool.install(|| {
        seeds
            .par_iter()
            .map(|&seed| generate_seeded(params, seed))
            .collect()
    }))
}

/// Независимые генерации по списку сидов; порядок результатов совпадает с сидами
#[cfg(not(feature = "parallel"))]
pub fn generate_batch(
    params: &GenerationParams,
    seeds: &[u64],
) -> Result<Vec<Result<DungeonLayout, LayoutError>>, GenerationError> {
    tracing::debug!(count = seeds.len(), "Пакетная генерация");
    Ok(seeds
        .iter()
        .map(|&seed| generate_seeded(params, seed))
        .collect())
}

fn generate_seeded(params: &GenerationParams, seed: u64) -> Result<DungeonLayout, LayoutError> {
    DungeonGenerator::from_seed(params.clone(), seed).generate()
}

/// Отложенная генерация в фоновом потоке
pub fn spawn_generation(
    params: GenerationParams,
    seed: u64,
) -> JoinHandle<Result<DungeonLayout, LayoutError>> {
    thread::spawn(move || generate_seeded(&params, seed))
}

/// Дожидается фоновой генерации
///
/// # Ошибки
/// [`GenerationError::WorkerPanicked`], если поток завершился паникой, иначе
/// ошибка самой генерации.
pub fn join_generation(
    handle: JoinHandle<Result<DungeonLayout, LayoutError>>,
) -> Result<DungeonLayout, GenerationError> {
    let layout = handle.join().map_err(|_| GenerationError::WorkerPanicked)??;
    Ok(layout)
}
