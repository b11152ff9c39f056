use clap::Parser;
use dungeongen::{DungeonGenerator, DungeonLayout, GenerationParams, RoomType, generate_batch};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Генератор подземелий: клеточный автомат, марковская тематизация и генетическая оптимизация
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML (по умолчанию: встроенные параметры)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Сид генерации (перекрывает значение из конфигурации)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Размер сетки (по умолчанию выбирается случайно из трёх градаций)
    #[arg(long)]
    size: Option<usize>,

    /// Число поколений генетического оптимизатора
    #[arg(short, long)]
    rounds: Option<usize>,

    /// Сколько подземелий сгенерировать подряд (сиды seed, seed+1, ...)
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info"),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut params = match &cli.config {
        Some(path) => {
            println!("🔍 Загрузка конфигурации из {path:?}...");
            GenerationParams::from_toml_file(&path.to_string_lossy())?
        }
        None => GenerationParams::default(),
    };
    if let Some(seed) = cli.seed {
        params.seed = seed;
    }
    if let Some(rounds) = cli.rounds {
        params.evolutionary_rounds = rounds;
    }

    let seeds: Vec<u64> = (0..cli.count as u64)
        .map(|i| params.seed.wrapping_add(i))
        .collect();

    let mut layouts = Vec::with_capacity(seeds.len());
    match cli.size {
        Some(size) => {
            for &seed in &seeds {
                let mut generator = DungeonGenerator::from_seed(params.clone(), seed);
                layouts.push(generator.generate_sized(size)?);
            }
        }
        None => {
            for layout in generate_batch(&params, &seeds)? {
                layouts.push(layout?);
            }
        }
    }

    for (i, (layout, seed)) in layouts.iter().zip(&seeds).enumerate() {
        let (number, size) = (i + 1, layout.size());
        println!("\nПодземелье #{number} (сид {seed}, размер {size}×{size}):");
        print!("{layout}");
        print_counts(layout);
    }

    println!("\nГотово!");
    Ok(())
}

fn print_counts(layout: &DungeonLayout) {
    println!(
        "Комнат: {}, сокровищниц: {}, ловушек: {}, боссов: {}",
        layout.traversable_count(),
        layout.count(RoomType::Treasure),
        layout.count(RoomType::Trap),
        layout.count(RoomType::Boss)
    );
}
