//! Ошибки генератора подземелий
//!
//! Алгоритмы генерации тотальны на корректном входе, поэтому ошибки возникают
//! только на границах: при создании сетки, при загрузке конфигурации и при
//! запуске генерации в пуле потоков.

use crate::layout::Pos;
use thiserror::Error;

/// Нарушение предусловий или инвариантов сетки подземелья
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("grid size must be positive, got {size}")]
    InvalidSize { size: usize },

    #[error("entrance ({x}, {y}) lies outside a {size}x{size} grid")]
    EntranceOutOfBounds { x: usize, y: usize, size: usize },

    #[error("position index for {room:?} disagrees with the grid at ({x}, {y})")]
    IndexMismatch {
        room: crate::layout::RoomType,
        x: usize,
        y: usize,
    },

    #[error("entrance cell ({x}, {y}) is not the only Entrance in the grid")]
    EntranceMismatch { x: usize, y: usize },

    #[error("{} traversable cells are unreachable from the entrance", .unreachable.len())]
    Disconnected { unreachable: Vec<Pos> },
}

/// Ошибки загрузки и проверки параметров генерации
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Ошибки пакетной и фоновой генерации
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[cfg(feature = "parallel")]
    #[error("could not build generation thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("background generation worker panicked")]
    WorkerPanicked,
}
