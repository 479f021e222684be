// ABOUTME: Main entry point for the outline-deck program.
// ABOUTME: Provides CLI interface and executes commands from the library.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use outline_deck::{BuildRequest, Config, ModeKind, WatchConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an outline and list the detected slides
    Parse(ParseArgs),

    /// Build a PPTX deck from an outline
    Build(BuildArgs),

    /// Rebuild the deck every time the outline changes
    Watch(WatchArgs),
}

#[derive(Args)]
struct ParseArgs {
    /// Path to the outline text file
    #[arg(short, long)]
    input: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Text only
    Text,
    /// Numbered images from a local directory
    Local,
    /// Images downloaded from the VISUEL: URLs
    Web,
    /// Images generated from the VISUEL: prompts
    Generative,
}

impl From<Mode> for ModeKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Text => ModeKind::TextOnly,
            Mode::Local => ModeKind::LocalImages,
            Mode::Web => ModeKind::WebImages,
            Mode::Generative => ModeKind::Generative,
        }
    }
}

#[derive(Args)]
struct BuildArgs {
    /// Path to the outline text file
    #[arg(short, long)]
    input: PathBuf,

    /// Path to output PPTX file
    #[arg(short, long)]
    output: PathBuf,

    /// Where slide images come from
    #[arg(long, value_enum, default_value = "text")]
    mode: Mode,

    /// Directory of images named after their slide number ("01 intro.png")
    #[arg(long)]
    images: Option<PathBuf>,

    /// Inference steps per generated image
    #[arg(long)]
    steps: Option<u32>,

    /// Generate an image for every slide instead of the first one only
    #[arg(long)]
    per_slide_images: bool,

    /// Title of the presentation
    #[arg(long)]
    title: Option<String>,
}

#[derive(Args)]
struct WatchArgs {
    #[command(flatten)]
    build: BuildArgs,

    /// Debounce time in milliseconds
    #[arg(long, default_value_t = 500)]
    debounce_ms: u64,
}

impl BuildArgs {
    fn to_request(&self, config: &Config) -> outline_deck::Result<BuildRequest> {
        let per_slide_images = self.per_slide_images.then_some(true);
        Ok(BuildRequest {
            outline_path: self.input.clone(),
            output_path: self.output.clone(),
            mode: self.mode.into(),
            images_dir: self.images.clone(),
            title: self.title.clone(),
            generation: config.get_generation_config(self.steps, per_slide_images)?,
        })
    }
}

fn print_progress(fraction: f64, message: &str) {
    println!("[{:>3}%] {}", (fraction * 100.0).round() as u32, message);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match run(&cli, &config) {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    match &cli.command {
        Some(Commands::Parse(args)) => {
            let records = outline_deck::run::read_outline(&args.input)
                .with_context(|| format!("Failed to read outline {:?}", args.input))?;

            println!("{} slides detected.", records.len());
            for (i, record) in records.iter().enumerate() {
                println!("{}. {}", i + 1, record.title);
                for bullet in &record.bullets {
                    println!("   • {}", bullet);
                }
                if !record.visual.is_empty() {
                    println!("   visual: {}", record.visual);
                }
            }
            Ok(())
        }
        Some(Commands::Build(args)) => {
            let request = args.to_request(config)?;
            let pipeline = matches!(request.mode, ModeKind::Generative)
                .then(|| outline_deck::run::http_pipeline(config));

            let mut progress = print_progress;
            let callback: &mut dyn FnMut(f64, &str) = &mut progress;
            let built = outline_deck::run_build(&request, config, pipeline.as_ref(), Some(callback))
                .with_context(|| format!("Failed to build deck from {:?}", args.input))?;

            println!(
                "Deck written to {:?}: {} slides, {} images attached, {} image failures",
                request.output_path,
                built.slide_count,
                built.images_attached(),
                built.image_failures()
            );
            Ok(())
        }
        Some(Commands::Watch(args)) => {
            let request = args.build.to_request(config)?;
            let pipeline = matches!(request.mode, ModeKind::Generative)
                .then(|| outline_deck::run::http_pipeline(config));

            println!("Watching {:?} (Press Ctrl+C to stop)", request.outline_path);
            let watch_config = WatchConfig {
                request,
                debounce_ms: args.debounce_ms,
            };
            outline_deck::watch_outline(watch_config, config, pipeline.as_ref())?;
            Ok(())
        }
        None => {
            println!("No command specified. Use --help for usage information.");
            Ok(())
        }
    }
}
