use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config TOML
    #[arg(long, default_value = "config.toml")]
    pub config: String,

    /// Directory for result files (overrides config)
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Seed for trial shuffling; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Participant number used to rotate the block order
    #[arg(long, default_value_t = 0)]
    pub participant: usize,

    /// Run in a window instead of fullscreen (overrides config)
    #[arg(long, default_value_t = false)]
    pub windowed: bool,
}
