// src/genetic/mod.rs
//! Генетический оптимизатор раскладки
//!
//! Популяция копий исходной сетки эволюционирует заданное число поколений:
//! элитизм, турнирный отбор, скрещивание по строкам и точечные мутации.
//! Лучшая особь последнего поколения записывается обратно в раскладку.

pub mod fitness;
pub mod individual;

use rand::Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::GeneticSettings;
use crate::layout::connectivity::reconnect;
use crate::layout::{CellGrid, DungeonLayout};

pub use fitness::Fitness;
pub use individual::Individual;

/// Итоги оптимизации
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizationReport {
    /// Число выполненных поколений
    pub rounds: usize,
    /// Лучшая приспособленность в каждом поколении
    pub best_per_round: Vec<f64>,
    /// Разложение приспособленности победителя
    pub best: Fitness,
    /// Коридоры, проложенные после записи победителя для восстановления связности
    pub repair_corridors: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GeneticOptimizer {
    settings: GeneticSettings,
}

impl GeneticOptimizer {
    #[must_use]
    pub fn new(settings: GeneticSettings) -> Self {
        Self { settings }
    }

    /// Эволюционирует раскладку `rounds` поколений и записывает лучшую особь
    ///
    /// Вход не меняется ни в одной особи. После записи победителя оторванные
    /// комнаты снова соединяются коридорами. При `rounds == 0` раскладка не
    /// меняется.
    pub fn optimize<R: Rng>(
        &self,
        layout: &mut DungeonLayout,
        rounds: usize,
        rng: &mut R,
    ) -> OptimizationReport {
        let mut report = OptimizationReport {
            rounds,
            ..OptimizationReport::default()
        };
        if rounds == 0 {
            report.best = fitness::evaluate(layout, &self.settings.weights);
            return report;
        }

        let mut population = self.initial_population(layout, rng);

        for round in 0..rounds {
            self.evaluate_population(&mut population);
            population.sort_by(by_fitness_desc);

            let best = population[0].fitness();
            report.best_per_round.push(best.total);
            tracing::trace!(round, fitness = best.total, "Поколение оценено");

            if round + 1 == rounds {
                population[0].write_into(layout);
                report.best = best;
                break;
            }

            population = self.next_generation(&population, rng);
        }

        report.repair_corridors = reconnect(layout, rng);

        tracing::debug!(
            rounds,
            fitness = report.best.total,
            connectivity = report.best.connectivity,
            distribution = report.best.distribution,
            aesthetics = report.best.aesthetics,
            challenge = report.best.challenge,
            repair_corridors = report.repair_corridors,
            "Генетическая оптимизация завершена"
        );
        report
    }

    /// Особь 0 - точная копия, остальные получают по два прохода мутации
    fn initial_population<R: Rng>(&self, layout: &DungeonLayout, rng: &mut R) -> Vec<Individual> {
        let size = self.settings.population_size.max(1);
        let mut population = Vec::with_capacity(size);
        population.push(Individual::from_layout(layout));

        for _ in 1..size {
            let mut individual = Individual::from_layout(layout);
            individual.mutate(self.settings.mutation_divisor, rng);
            individual.mutate(self.settings.mutation_divisor, rng);
            population.push(individual);
        }
        population
    }

    fn evaluate_population(&self, population: &mut [Individual]) {
        let weights = self.settings.weights;

        #[cfg(feature = "parallel")]
        population.par_iter_mut().for_each(|individual| {
            individual.evaluate(&weights);
        });

        #[cfg(not(feature = "parallel"))]
        for individual in population.iter_mut() {
            individual.evaluate(&weights);
        }
    }

    /// Новое поколение из отсортированного по убыванию приспособленности
    fn next_generation<R: Rng>(&self, ranked: &[Individual], rng: &mut R) -> Vec<Individual> {
        let target = ranked.len();
        let elite = self.settings.elite_count().min(target);
        let mut next: Vec<Individual> = ranked[..elite].to_vec();

        while next.len() < target {
            let first = self.select_parent(ranked, rng);
            let second = self.select_parent(ranked, rng);

            let mut child = if rng.gen_range(0.0..1.0) < self.settings.crossover_rate {
                let cut = rng.gen_range(0..first.size());
                Individual::crossover(first, second, cut)
            } else {
                first.clone()
            };

            if rng.gen_range(0.0..1.0) < self.settings.mutation_rate {
                child.mutate(self.settings.mutation_divisor, rng);
            }
            next.push(child);
        }
        next
    }

    /// Турнир: лучшая из `tournament_size` случайных особей (с повторами)
    fn select_parent<'a, R: Rng>(
        &self,
        population: &'a [Individual],
        rng: &mut R,
    ) -> &'a Individual {
        let mut best = &population[rng.gen_range(0..population.len())];
        for _ in 1..self.settings.tournament_size {
            let candidate = &population[rng.gen_range(0..population.len())];
            if candidate.fitness().total > best.fitness().total {
                best = candidate;
            }
        }
        best
    }
}

fn by_fitness_desc(a: &Individual, b: &Individual) -> std::cmp::Ordering {
    b.fitness().total.total_cmp(&a.fitness().total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cellular::CellularAutomata;
    use crate::layout::RoomType;
    use crate::markov::MarkovChainModel;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn themed_layout(size: usize, seed: u64) -> (DungeonLayout, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut layout = DungeonLayout::with_centered_entrance(size).unwrap();
        CellularAutomata::default().carve(&mut layout, &mut rng);
        MarkovChainModel::default().relax(&mut layout, &mut rng);
        (layout, rng)
    }

    #[test]
    fn best_fitness_never_decreases() {
        let (mut layout, mut rng) = themed_layout(30, 1234);
        let optimizer = GeneticOptimizer::default();
        let report = optimizer.optimize(&mut layout, 12, &mut rng);

        assert_eq!(report.rounds, 12);
        assert_eq!(report.best_per_round.len(), 12);
        for pair in report.best_per_round.windows(2) {
            assert!(pair[1] >= pair[0], "{:?}", report.best_per_round);
        }
        let last = report.best_per_round[11];
        assert!((report.best.total - last).abs() < f64::EPSILON);
    }

    #[test]
    fn optimized_layout_keeps_entrance_and_connectivity() {
        let (mut layout, mut rng) = themed_layout(25, 77);
        let entrance = layout.entrance();

        let optimizer = GeneticOptimizer::default();
        optimizer.optimize(&mut layout, 6, &mut rng);

        assert_eq!(layout.entrance(), entrance);
        assert_eq!(layout.room_type(entrance.0, entrance.1), RoomType::Entrance);
        assert_eq!(layout.count(RoomType::Entrance), 1);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn zero_rounds_leave_layout_untouched() {
        let (mut layout, mut rng) = themed_layout(20, 5);
        let before = layout.clone();
        let optimizer = GeneticOptimizer::default();
        let report = optimizer.optimize(&mut layout, 0, &mut rng);
        assert_eq!(layout, before);
        assert!(report.best_per_round.is_empty());
    }

    #[test]
    fn single_round_writes_back_best_of_initial_population() {
        let (mut layout, mut rng) = themed_layout(20, 8);
        let optimizer = GeneticOptimizer::default();
        let report = optimizer.optimize(&mut layout, 1, &mut rng);
        assert_eq!(report.best_per_round.len(), 1);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn same_seed_gives_same_result() {
        let run = || {
            let (mut layout, mut rng) = themed_layout(25, 99);
            let optimizer = GeneticOptimizer::default();
            let report = optimizer.optimize(&mut layout, 4, &mut rng);
            (layout, report)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn tournament_of_whole_population_picks_the_best() {
        let layout = DungeonLayout::with_centered_entrance(6).unwrap();
        let mut population: Vec<Individual> =
            (0..3).map(|_| Individual::from_layout(&layout)).collect();
        population[1].set((2, 3), RoomType::Boss);
        let weights = crate::config::FitnessWeights::default();
        for individual in &mut population {
            individual.evaluate(&weights);
        }

        let optimizer = GeneticOptimizer::new(GeneticSettings {
            tournament_size: 64,
            ..GeneticSettings::default()
        });
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let winner = optimizer.select_parent(&population, &mut rng);
        let best = population
            .iter()
            .map(|i| i.fitness().total)
            .fold(f64::MIN, f64::max);
        assert!((winner.fitness().total - best).abs() < f64::EPSILON);
    }
}
