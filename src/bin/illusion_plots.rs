use std::error::Error;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use illusion::analysis::load::{load_many, load_results};
use illusion::analysis::plots::{ViolinPanel, render_block_panels, render_surface, render_violins};
use illusion::analysis::summary::{
    BlockLayout, best_level, ratings_by_level, split_blocks, summarize_by_level, surface,
};
use illusion::analysis::units::DisplayUnits;
use illusion::config::AppConfig;
use illusion::experiment::results::ResultRecord;
use illusion::experiment::variables::Variable;

#[derive(Parser, Debug)]
#[command(name = "illusion_plots", author, version, about = "Summaries and figures from result files")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output directory for figures
    #[arg(long, global = true, default_value = "target/plots")]
    out_dir: PathBuf,

    /// Top of the rating axis (100 for the slider, 7 for keys)
    #[arg(long, global = true, default_value_t = 100.0)]
    y_max: f64,

    /// Frame rate the periods were recorded at
    #[arg(long, global = true, default_value_t = 100.0)]
    fps: f64,

    /// Degrees of visual angle per pixel
    #[arg(long, global = true, default_value_t = std::f64::consts::PI / 180.0)]
    deg_per_px: f64,

    /// Keep pixels and frames on the axes
    #[arg(long, global = true, default_value_t = false)]
    raw_units: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print mean, SEM and best level per variable
    Summary {
        #[arg(long, value_delimiter = ',', default_value = "line_length,stim_radius,stim_period")]
        variables: Vec<Variable>,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Error-bar panels for one session, split into its blocks
    Blocks {
        file: PathBuf,
        /// Runner config the session was recorded with (built-in defaults otherwise)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Presentations per combination (config value otherwise)
        #[arg(long)]
        reps: Option<usize>,
        /// Variable of each block, in file order (config order otherwise)
        #[arg(long, value_delimiter = ',')]
        order: Option<Vec<Variable>>,
        /// Level count of each block, in file order; needs --order
        #[arg(long, value_delimiter = ',', requires = "order")]
        levels: Option<Vec<usize>>,
    },
    /// Violin plots of the pooled ratings
    Violin {
        #[arg(long, value_delimiter = ',', default_value = "line_length,stim_radius,stim_period")]
        variables: Vec<Variable>,
        #[arg(long, default_value = "violin")]
        name: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Violin plots for two groups of sessions
    Compare {
        #[arg(long, value_delimiter = ',', required = true)]
        old: Vec<PathBuf>,
        #[arg(long, value_delimiter = ',', required = true)]
        new: Vec<PathBuf>,
        #[arg(long, value_delimiter = ',', default_value = "line_length,stim_radius,stim_period")]
        variables: Vec<Variable>,
    },
    /// 3D surface of mean rating over two variables
    Surface {
        #[arg(long, default_value = "line_length")]
        x: Variable,
        #[arg(long, default_value = "stim_radius")]
        y: Variable,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "illusion=info,illusion_plots=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let units = DisplayUnits {
        deg_per_px: cli.deg_per_px,
        fps: cli.fps,
        raw: cli.raw_units,
    };

    match &cli.command {
        Command::Summary { variables, files } => {
            let records = load_many(files)?;
            print_summary(&records, variables, &units);
        }
        Command::Blocks {
            file,
            config,
            reps,
            order,
            levels,
        } => {
            let cfg = match config {
                Some(path) => AppConfig::from_file(path)?,
                None => AppConfig::default(),
            };
            let layout = block_layout(&cfg, order.as_deref(), levels.as_deref())?;
            let reps = reps.unwrap_or(cfg.design.reps);
            let records = load_results(file)?;
            let blocks = split_blocks(&records, reps, &layout)?;
            println!("Best:");
            for b in &blocks {
                if let Some(level) = b.best() {
                    println!("  {}: {}", b.variable, level);
                }
            }
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "session".into());
            let out = prepare(&cli.out_dir, &format!("{stem}_blocks.png"))?;
            render_block_panels(&out, &blocks, &units, cli.y_max)?;
            info!("Wrote {}", out.display());
        }
        Command::Violin {
            variables,
            name,
            files,
        } => {
            let records = load_many(files)?;
            let out = prepare(&cli.out_dir, &format!("{name}.png"))?;
            let title = format!("{} session(s), {} ratings", files.len(), records.len());
            render_violins(&out, &title, &violin_panels(&records, variables), &units, cli.y_max)?;
            info!("Wrote {}", out.display());
        }
        Command::Compare {
            old,
            new,
            variables,
        } => {
            for (label, files) in [("old", old), ("new", new)] {
                let records = load_many(files)?;
                println!("== {label} ({} files)", files.len());
                print_summary(&records, variables, &units);
                let out = prepare(&cli.out_dir, &format!("violin_{label}.png"))?;
                let title = format!("{label}: {} ratings", records.len());
                render_violins(
                    &out,
                    &title,
                    &violin_panels(&records, variables),
                    &units,
                    cli.y_max,
                )?;
                info!("Wrote {}", out.display());
            }
        }
        Command::Surface { x, y, files } => {
            if x == y {
                return Err("--x and --y must differ".into());
            }
            let records = load_many(files)?;
            let s = surface(&records, *x, *y);
            let out = prepare(&cli.out_dir, &format!("surface_{x}_{y}.png"))?;
            render_surface(&out, &s, &units, cli.y_max)?;
            info!("Wrote {}", out.display());
        }
    }
    Ok(())
}

fn block_layout(
    cfg: &AppConfig,
    order: Option<&[Variable]>,
    levels: Option<&[usize]>,
) -> Result<Vec<BlockLayout>, Box<dyn Error>> {
    let Some(order) = order else {
        return Ok(BlockLayout::from_design(cfg)?);
    };
    let levels: Vec<usize> = match levels {
        Some(levels) if levels.len() != order.len() => {
            return Err(format!(
                "--levels has {} entries but --order has {}",
                levels.len(),
                order.len()
            )
            .into());
        }
        Some(levels) => levels.to_vec(),
        None => order.iter().map(|&v| cfg.levels.len(v)).collect(),
    };
    Ok(order
        .iter()
        .zip(levels)
        .map(|(&variable, levels)| BlockLayout { variable, levels })
        .collect())
}

fn prepare(out_dir: &Path, file_name: &str) -> Result<PathBuf, Box<dyn Error>> {
    create_dir_all(out_dir)?;
    Ok(out_dir.join(file_name))
}

fn violin_panels(records: &[ResultRecord], variables: &[Variable]) -> Vec<ViolinPanel> {
    variables
        .iter()
        .map(|&variable| ViolinPanel {
            variable,
            groups: ratings_by_level(records, variable),
        })
        .collect()
}

fn print_summary(records: &[ResultRecord], variables: &[Variable], units: &DisplayUnits) {
    for &var in variables {
        let summaries = summarize_by_level(records, var);
        println!("{} ({})", var, units.unit(var));
        println!("  {:>8} {:>10} {:>5} {:>8} {:>8}", "level", "display", "n", "mean", "sem");
        for s in &summaries {
            println!(
                "  {:>8} {:>10.3} {:>5} {:>8.2} {:>8.2}",
                s.level,
                units.convert(var, s.level),
                s.n,
                s.mean,
                s.sem
            );
        }
        if let Some(best) = best_level(&summaries) {
            println!("  best: {best}");
        }
    }
}
