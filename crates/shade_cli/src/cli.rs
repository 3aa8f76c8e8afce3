use clap::{Args, Parser, Subcommand};
use shade_core::HeuristicVersion;
use shade_core::Rgb;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shadekit", version, about = "Catalog image and shade tooling")]
pub struct Cli {
    #[arg(long, global = true, help = "TOML config file (default: ./shadekit.toml if present)")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "More logging (-v info, -vv debug)")]
    pub verbose: u8,
    #[arg(short, long, global = true, conflicts_with = "verbose", help = "Only log errors")]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Re-encode an image, or every large image under a directory.
    Compress(CompressArgs),
    /// Replace near-white pixels with the store grey.
    Background(BackgroundArgs),
    /// Flood-fill white backgrounds from the image border.
    FloodBackground(FloodArgs),
    /// Key out a near-black background by luma.
    Key(KeyArgs),
    /// Remove a badge on the right and re-centre the product.
    BadgeCrop(BadgeArgs),
    /// Swatch colour per shade folder.
    ExtractSwatches(SwatchArgs),
    /// Classify a product's shades by dominant colour.
    Classify(ClassifyArgs),
    /// Classify a product's shades by official shade number.
    Official(OfficialArgs),
    /// Drop the Special group from colour mapping files.
    StripSpecial(StripSpecialArgs),
    /// Build the shade scraping queue from colour mappings.
    PrepareQueue(PrepareQueueArgs),
    /// Scrape one product page and its images.
    ScrapeProduct(ScrapeProductArgs),
    /// Scrape shade pages listed in a queue CSV.
    ScrapeShades(ScrapeShadesArgs),
    /// Compare a reference product list against scraped products.
    Reconcile(ReconcileArgs),
}

fn parse_colour(s: &str) -> Result<Rgb, String> {
    shade_core::color::parse_rgb(s).map_err(|e| e.to_string())
}

#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Image file or directory.
    pub path: PathBuf,
    #[arg(short, long, help = "Output file (single-file mode only)")]
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub quality: Option<u8>,
    #[arg(long)]
    pub max_dimension: Option<u32>,
    #[arg(long, help = "Directory mode: minimum size in KiB")]
    pub min_size_kb: Option<u64>,
    #[arg(long, help = "Directory mode: only list what would be compressed")]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct BackgroundArgs {
    /// Image file or directory.
    pub input: PathBuf,
    #[arg(short, long, help = "Output file or directory (default: alongside the input)")]
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub threshold: Option<u8>,
    #[arg(long, value_parser = parse_colour, help = "Replacement colour as R,G,B")]
    pub grey: Option<Rgb>,
}

#[derive(Args, Debug)]
pub struct FloodArgs {
    /// Image files or directories.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    #[arg(long)]
    pub white_threshold: Option<u8>,
    #[arg(long, help = "Summed RGB distance the fill may cross")]
    pub tolerance: Option<u16>,
    #[arg(long, value_parser = parse_colour)]
    pub grey: Option<Rgb>,
    /// File names to pick out of directories (default: 02.png,03.png).
    #[arg(long, value_delimiter = ',', conflicts_with = "all_images")]
    pub files: Vec<String>,
    /// Process every image found in directories.
    #[arg(long)]
    pub all_images: bool,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    #[arg(long)]
    pub t0: Option<u8>,
    #[arg(long)]
    pub t1: Option<u8>,
}

#[derive(Args, Debug)]
pub struct BadgeArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    #[arg(long)]
    pub keep_left: Option<f32>,
    #[arg(long)]
    pub scale: Option<f32>,
    #[arg(long)]
    pub x_position: Option<f32>,
}

#[derive(Args, Debug)]
pub struct SwatchArgs {
    /// Directory with one folder per shade.
    pub shades_dir: PathBuf,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Product JSON with a `shades` list.
    pub product: PathBuf,
    #[arg(long, help = "Directory holding the shade images")]
    pub images: PathBuf,
    #[arg(long, help = "v1 (RGB rules) or v2 (HSV rules)")]
    pub heuristic: Option<HeuristicVersion>,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct OfficialArgs {
    pub product: PathBuf,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct StripSpecialArgs {
    /// Directory of `color_mapping_*.json` files.
    pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct PrepareQueueArgs {
    /// Directory of `color_mapping_*.json` files.
    pub mappings_dir: PathBuf,
    #[arg(short, long, default_value = "shade_queue.csv")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct ScrapeProductArgs {
    pub url: String,
    #[arg(long, default_value = "scraped_data")]
    pub out_dir: PathBuf,
    #[arg(long)]
    pub no_images: bool,
}

#[derive(Args, Debug)]
pub struct ScrapeShadesArgs {
    pub queue: PathBuf,
    #[arg(long, default_value = "scraped_shades")]
    pub out_dir: PathBuf,
    #[arg(long, default_value_t = 0)]
    pub start: usize,
    #[arg(long)]
    pub max: Option<usize>,
    #[arg(long)]
    pub no_images: bool,
}

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Reference names: JSON array or one name per line.
    pub reference: PathBuf,
    #[arg(long, help = "Scraped products JSON array")]
    pub products: PathBuf,
    #[arg(long)]
    pub prefix: Option<String>,
    #[arg(long)]
    pub images_dir: Option<PathBuf>,
}
