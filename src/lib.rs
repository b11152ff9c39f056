pub mod cellular;
pub mod config;
pub mod error;
pub mod generator;
pub mod genetic;
pub mod layout;
pub mod markov;

pub use config::{
    CellularSettings, FeatureSettings, FitnessWeights, GenerationParams, GeneticSettings,
    MarkovSettings, SizeTiers,
};
pub use error::{ConfigError, GenerationError, LayoutError};
pub use generator::{DungeonGenerator, generate_batch, join_generation, spawn_generation};
pub use layout::{CellGrid, DungeonLayout, Pos, RoomType};
