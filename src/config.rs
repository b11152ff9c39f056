// src/config.rs
//! Конфигурация генерации подземелий
//!
//! Этот модуль определяет все числовые параметры конвейера:
//! - Размеры сетки и вероятности их выбора
//! - Параметры клеточного автомата
//! - Пополнение особых комнат после марковского прохода
//! - Параметры генетического оптимизатора и веса функции приспособленности
//! - Количество финальных особых комнат
//!
//! Все структуры поддерживают сериализацию в TOML. Любой отсутствующий ключ
//! заменяется значением по умолчанию, поэтому пустой файл тоже корректен.

use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::ConfigError;

/// Размеры сетки и вероятности их выбора
///
/// Случайное `u ∈ [0, 1)` выбирает `small` при `u < small_threshold`,
/// `medium` при `u < medium_threshold`, иначе `large`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SizeTiers {
    #[serde(default = "default_small")]
    pub small: usize,

    #[serde(default = "default_medium")]
    pub medium: usize,

    #[serde(default = "default_large")]
    pub large: usize,

    /// Накопленная вероятность малого подземелья (по умолчанию 50%)
    #[serde(default = "default_small_threshold")]
    pub small_threshold: f64,

    /// Накопленная вероятность малого или среднего (по умолчанию 80%)
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: f64,
}

fn default_small() -> usize {
    25
}
fn default_medium() -> usize {
    40
}
fn default_large() -> usize {
    60
}
fn default_small_threshold() -> f64 {
    0.5
}
fn default_medium_threshold() -> f64 {
    0.8
}

impl SizeTiers {
    /// Выбирает размер по равномерной случайной величине `u ∈ [0, 1)`
    #[must_use]
    pub fn pick(&self, u: f64) -> usize {
        if u < self.small_threshold {
            self.small
        } else if u < self.medium_threshold {
            self.medium
        } else {
            self.large
        }
    }
}

impl Default for SizeTiers {
    fn default() -> Self {
        Self {
            small: 25,
            medium: 40,
            large: 60,
            small_threshold: 0.5,
            medium_threshold: 0.8,
        }
    }
}

/// Параметры клеточного автомата
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellularSettings {
    /// Доля изначально заполненных клеток в процентах (0–100)
    #[serde(default = "default_initial_fill_percent")]
    pub initial_fill_percent: u32,

    /// Число шагов симуляции
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Пустая клетка заполняется, если соседей строго больше этого числа
    #[serde(default = "default_birth_limit")]
    pub birth_limit: usize,

    /// Заполненная клетка выживает, если соседей не меньше этого числа
    #[serde(default = "default_death_limit")]
    pub death_limit: usize,

    /// Радиус (по Чебышёву) принудительно заполненной области вокруг входа
    #[serde(default = "default_entrance_clearance")]
    pub entrance_clearance: usize,
}

fn default_initial_fill_percent() -> u32 {
    45
}
fn default_iterations() -> usize {
    4
}
fn default_birth_limit() -> usize {
    4
}
fn default_death_limit() -> usize {
    3
}
fn default_entrance_clearance() -> usize {
    2
}

impl Default for CellularSettings {
    fn default() -> Self {
        Self {
            initial_fill_percent: 45,
            iterations: 4,
            birth_limit: 4,
            death_limit: 3,
            entrance_clearance: 2,
        }
    }
}

/// Пополнение особых комнат после марковского прохода
///
/// Сокровищниц `max(min_treasure, size / treasure_divisor)`, ловушек
/// `max(min_traps, size / trap_divisor)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkovSettings {
    #[serde(default = "default_markov_treasure_divisor")]
    pub treasure_divisor: usize,

    #[serde(default = "default_min_treasure")]
    pub min_treasure: usize,

    #[serde(default = "default_markov_trap_divisor")]
    pub trap_divisor: usize,

    #[serde(default = "default_min_traps")]
    pub min_traps: usize,

    /// Сколько случайных клеток пробовать при расстановке
    #[serde(default = "default_probe_attempts")]
    pub probe_attempts: usize,
}

fn default_markov_treasure_divisor() -> usize {
    10
}
fn default_min_treasure() -> usize {
    1
}
fn default_markov_trap_divisor() -> usize {
    8
}
fn default_min_traps() -> usize {
    2
}
fn default_probe_attempts() -> usize {
    100
}

impl Default for MarkovSettings {
    fn default() -> Self {
        Self {
            treasure_divisor: 10,
            min_treasure: 1,
            trap_divisor: 8,
            min_traps: 2,
            probe_attempts: 100,
        }
    }
}

/// Веса слагаемых функции приспособленности
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FitnessWeights {
    #[serde(default = "default_connectivity_weight")]
    pub connectivity: f64,

    #[serde(default = "default_distribution_weight")]
    pub distribution: f64,

    #[serde(default = "default_aesthetics_weight")]
    pub aesthetics: f64,

    #[serde(default = "default_challenge_weight")]
    pub challenge: f64,
}

fn default_connectivity_weight() -> f64 {
    0.4
}
fn default_distribution_weight() -> f64 {
    0.3
}
fn default_aesthetics_weight() -> f64 {
    0.2
}
fn default_challenge_weight() -> f64 {
    0.1
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            connectivity: 0.4,
            distribution: 0.3,
            aesthetics: 0.2,
            challenge: 0.1,
        }
    }
}

/// Параметры генетического оптимизатора
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneticSettings {
    #[serde(default = "default_population_size")]
    pub population_size: usize,

    /// Размер турнира при выборе родителя
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,

    /// Вероятность мутации потомка
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,

    /// Вероятность скрещивания (иначе потомок копирует первого родителя)
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,

    /// Проход мутации делает `size / mutation_divisor` точечных изменений
    #[serde(default = "default_mutation_divisor")]
    pub mutation_divisor: usize,

    #[serde(default)]
    pub weights: FitnessWeights,
}

fn default_population_size() -> usize {
    10
}
fn default_tournament_size() -> usize {
    3
}
fn default_mutation_rate() -> f64 {
    0.2
}
fn default_crossover_rate() -> f64 {
    0.7
}
fn default_mutation_divisor() -> usize {
    5
}

impl GeneticSettings {
    /// Элита: 20% популяции, но не меньше одной особи
    #[must_use]
    pub fn elite_count(&self) -> usize {
        (self.population_size / 5).max(1).min(self.population_size)
    }
}

impl Default for GeneticSettings {
    fn default() -> Self {
        Self {
            population_size: 10,
            tournament_size: 3,
            mutation_rate: 0.2,
            crossover_rate: 0.7,
            mutation_divisor: 5,
            weights: FitnessWeights::default(),
        }
    }
}

/// Финальная расстановка босса, сокровищниц и ловушек
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSettings {
    #[serde(default = "default_feature_treasure_divisor")]
    pub treasure_divisor: usize,

    #[serde(default = "default_min_treasure")]
    pub min_treasure: usize,

    #[serde(default = "default_feature_trap_divisor")]
    pub trap_divisor: usize,

    #[serde(default = "default_min_traps")]
    pub min_traps: usize,

    /// Ловушки ставятся дальше `size / trap_distance_divisor` от входа
    #[serde(default = "default_trap_distance_divisor")]
    pub trap_distance_divisor: usize,

    #[serde(default = "default_probe_attempts")]
    pub probe_attempts: usize,
}

fn default_feature_treasure_divisor() -> usize {
    15
}
fn default_feature_trap_divisor() -> usize {
    10
}
fn default_trap_distance_divisor() -> usize {
    5
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            treasure_divisor: 15,
            min_treasure: 1,
            trap_divisor: 10,
            min_traps: 2,
            trap_distance_divisor: 5,
            probe_attempts: 100,
        }
    }
}

/// Основные параметры генерации подземелья
///
/// Полная конфигурация одного запуска конвейера. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationParams {
    /// Сид генератора случайных чисел (детерминированная генерация)
    #[serde(default)]
    pub seed: u64,

    /// Число поколений генетического оптимизатора
    #[serde(default = "default_evolutionary_rounds")]
    pub evolutionary_rounds: usize,

    /// Ограничение на число одновременных генераций в пакетном режиме
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default)]
    pub sizes: SizeTiers,

    #[serde(default)]
    pub cellular: CellularSettings,

    #[serde(default)]
    pub markov: MarkovSettings,

    #[serde(default)]
    pub genetic: GeneticSettings,

    #[serde(default)]
    pub features: FeatureSettings,
}

fn default_evolutionary_rounds() -> usize {
    10
}
fn default_max_concurrent() -> usize {
    4
}

impl GenerationParams {
    /// Загружает параметры из TOML-файла
    ///
    /// # Аргументы
    /// * `path` - путь к файлу конфигурации в формате TOML
    ///
    /// # Ошибки
    /// Возвращает ошибку, если файл не найден, содержит недопустимый формат
    /// или значения не проходят [`GenerationParams::validate`].
    ///
    /// # Пример
    /// ```toml
    /// # dungeon.toml
    /// seed = 42
    /// evolutionary_rounds = 5
    ///
    /// [sizes]
    /// small = 20
    ///
    /// [genetic]
    /// mutation_rate = 0.3
    /// ```
    pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Разбирает параметры из строки TOML
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let params: Self = toml::from_str(contents)?;
        params.validate()?;
        Ok(params)
    }

    /// Проверяет значения, при которых конвейер не может работать
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("sizes.small", self.sizes.small),
            ("sizes.medium", self.sizes.medium),
            ("sizes.large", self.sizes.large),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "grid size must be positive".to_owned(),
                });
            }
        }
        if self.cellular.initial_fill_percent > 100 {
            return Err(ConfigError::Invalid {
                field: "cellular.initial_fill_percent",
                reason: format!("{} is above 100", self.cellular.initial_fill_percent),
            });
        }
        for (field, rate) in [
            ("genetic.mutation_rate", self.genetic.mutation_rate),
            ("genetic.crossover_rate", self.genetic.crossover_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{rate} is not a probability"),
                });
            }
        }
        for (field, value) in [
            ("genetic.population_size", self.genetic.population_size),
            ("genetic.tournament_size", self.genetic.tournament_size),
            ("genetic.mutation_divisor", self.genetic.mutation_divisor),
            ("markov.treasure_divisor", self.markov.treasure_divisor),
            ("markov.trap_divisor", self.markov.trap_divisor),
            ("features.treasure_divisor", self.features.treasure_divisor),
            ("features.trap_divisor", self.features.trap_divisor),
            (
                "features.trap_distance_divisor",
                self.features.trap_distance_divisor,
            ),
            ("max_concurrent", self.max_concurrent),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least 1".to_owned(),
                });
            }
        }
        Ok(())
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            seed: 0,
            evolutionary_rounds: 10,
            max_concurrent: 4,
            sizes: SizeTiers::default(),
            cellular: CellularSettings::default(),
            markov: MarkovSettings::default(),
            genetic: GeneticSettings::default(),
            features: FeatureSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_toml_yields_defaults() {
        let params = GenerationParams::from_toml_str("").unwrap();
        assert_eq!(params, GenerationParams::default());
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let params = GenerationParams::from_toml_str(
            r#"
            seed = 42
            evolutionary_rounds = 5

            [sizes]
            small = 20

            [genetic]
            mutation_rate = 0.3
            "#,
        )
        .unwrap();

        assert_eq!(params.seed, 42);
        assert_eq!(params.evolutionary_rounds, 5);
        assert_eq!(params.sizes.small, 20);
        assert_eq!(params.sizes.medium, 40);
        assert!((params.genetic.mutation_rate - 0.3).abs() < f64::EPSILON);
        assert_eq!(params.genetic.population_size, 10);
        assert_eq!(params.cellular, CellularSettings::default());
    }

    #[test]
    fn serialized_defaults_parse_back() {
        let text = toml::to_string(&GenerationParams::default()).unwrap();
        assert_eq!(
            GenerationParams::from_toml_str(&text).unwrap(),
            GenerationParams::default()
        );
    }

    #[rstest]
    #[case("[sizes]\nmedium = 0", "sizes.medium")]
    #[case("[cellular]\ninitial_fill_percent = 101", "cellular.initial_fill_percent")]
    #[case("[genetic]\ncrossover_rate = 1.5", "genetic.crossover_rate")]
    #[case("[genetic]\npopulation_size = 0", "genetic.population_size")]
    #[case("max_concurrent = 0", "max_concurrent")]
    fn invalid_values_are_reported(#[case] text: &str, #[case] expected: &str) {
        match GenerationParams::from_toml_str(text) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
            other => panic!("expected Invalid({expected}), got {other:?}"),
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            GenerationParams::from_toml_str("seed = ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            GenerationParams::from_toml_file("/nonexistent/dungeon.toml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[rstest]
    #[case(0.0, 25)]
    #[case(0.49, 25)]
    #[case(0.5, 40)]
    #[case(0.79, 40)]
    #[case(0.8, 60)]
    #[case(0.999, 60)]
    fn size_tiers_follow_thresholds(#[case] u: f64, #[case] expected: usize) {
        assert_eq!(SizeTiers::default().pick(u), expected);
    }

    #[rstest]
    #[case(10, 2)]
    #[case(4, 1)]
    #[case(1, 1)]
    fn elite_is_a_fifth_of_population(#[case] population: usize, #[case] elite: usize) {
        let settings = GeneticSettings {
            population_size: population,
            ..GeneticSettings::default()
        };
        assert_eq!(settings.elite_count(), elite);
    }
}
