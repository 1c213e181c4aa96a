use std::path::{Path, PathBuf};

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use yamlcycler::cli::{Cli, Command, CycleArgs};
use yamlcycler::config::Config;
use yamlcycler::{
    CategoryConfigs, CycleRequest, CycleState, CyclerError, ImageCycler, ImageCyclerSimple, ImageEntry, LoraExtractor,
    LoraLibrary, LoraLoader, LoraLoaderRequest, LoraRequest, LoraSelector, NodeKind, ResolvedMask, parse_lora,
    state_file,
};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Config values with CLI overrides applied
struct Settings {
    yaml_path: PathBuf,
    parent_dir: PathBuf,
    lora_dir: Option<PathBuf>,
}

impl Settings {
    fn new(cli: &Cli, config: Config) -> Self {
        Self {
            yaml_path: cli.yaml_path.clone().unwrap_or(config.yaml_path),
            parent_dir: cli.parent_dir.clone().unwrap_or(config.parent_dir),
            lora_dir: cli.lora_dir.clone().or(config.lora_dir),
        }
    }

    fn cycle_request(&self, category: &str) -> CycleRequest {
        CycleRequest {
            yaml_path: self.yaml_path.clone(),
            parent_dir: self.parent_dir.clone(),
            category: category.to_string(),
        }
    }

    fn lora_request(&self, category: &str) -> LoraRequest {
        LoraRequest {
            yaml_path: self.yaml_path.clone(),
            category: category.to_string(),
        }
    }

    /// Scan the configured LoRA directory
    fn library(&self) -> Result<LoraLibrary> {
        let dir = self
            .lora_dir
            .as_ref()
            .ok_or_else(|| eyre!("LoRA directory not configured; pass --lora-dir or set lora-dir in the config"))?;
        Ok(LoraLibrary::scan(dir))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let settings = Settings::new(&cli, config);
    info!("yamlcycler starting");

    match &cli.command {
        Command::Next(args) => cmd_cycle(&settings, args, NodeKind::ImageCycler),
        Command::Simple(args) => cmd_cycle(&settings, args, NodeKind::ImageCyclerSimple),
        Command::Loras { category } => cmd_loras(&settings, category),
        Command::Select { category } => cmd_select(&settings, category),
        Command::Load {
            category,
            override1,
            override2,
            override3,
        } => cmd_load(
            &settings,
            category,
            [override1.clone(), override2.clone(), override3.clone()],
        ),
        Command::Categories => cmd_categories(&settings),
        Command::State { path } => cmd_state(path),
        Command::ParseLora { raw } => cmd_parse_lora(raw),
        Command::Nodes => {
            for kind in NodeKind::ALL {
                println!("{:<24} {}", kind.id().cyan(), kind.display_name());
            }
            Ok(())
        }
    }
}

fn cmd_cycle(settings: &Settings, args: &CycleArgs, kind: NodeKind) -> Result<()> {
    debug!(?args, %kind, "cmd_cycle: called");
    let mut state = match &args.state {
        Some(path) => state_file::load(path)?,
        None => CycleState::new(),
    };

    let request = settings.cycle_request(&args.category);
    let result = run_cycles(&mut state, &request, args.count, kind);

    // Keep the counters advanced by the steps that succeeded
    if let Some(path) = &args.state {
        state_file::save(path, &state)?;
    }

    if let Some(mask) = result?
        && let Some(out) = &args.mask_out
    {
        mask.mask.save(out).context("Failed to write mask")?;
        println!("{} Mask written to {}", "✓".green(), out.display());
    }
    Ok(())
}

fn run_cycles(
    state: &mut CycleState,
    request: &CycleRequest,
    count: usize,
    kind: NodeKind,
) -> Result<Option<ResolvedMask>> {
    let mut last_mask = None;
    for _ in 0..count {
        let mask = match kind {
            NodeKind::ImageCyclerSimple => {
                let out = ImageCyclerSimple
                    .execute(state, request)
                    .inspect_err(|e| folder_hint(e, request))?;
                print_entry(&out.entry);
                out.mask
            }
            _ => {
                let out = ImageCycler
                    .execute(state, request)
                    .inspect_err(|e| folder_hint(e, request))?;
                print_entry(&out.entry);
                println!("  {} {}", "prompt:".dimmed(), out.prompt);
                for (i, lora) in out.loras.iter().enumerate() {
                    println!("  {} {}", format!("lora{}:", i + 1).dimmed(), lora);
                }
                out.mask
            }
        };
        print_mask(&mask);
        last_mask = Some(mask);
    }
    Ok(last_mask)
}

fn folder_hint(err: &CyclerError, request: &CycleRequest) {
    if err.is_folder_error() {
        eprintln!(
            "{} put the images for '{}' in {}",
            "hint:".yellow(),
            request.category,
            request.parent_dir.join(&request.category).display()
        );
    }
}

fn print_entry(entry: &ImageEntry) {
    println!(
        "{} {} {}",
        "✓".green(),
        format!("{}/{}", entry.position, entry.total).yellow(),
        entry.path.display()
    );
}

fn print_mask(mask: &ResolvedMask) {
    match &mask.source {
        Some(path) => println!("  {} {}", "mask:".dimmed(), path.display()),
        None => println!(
            "  {} {}",
            "mask:".dimmed(),
            format!("(empty {}x{})", mask.mask.width, mask.mask.height).dimmed()
        ),
    }
}

fn cmd_loras(settings: &Settings, category: &str) -> Result<()> {
    let extractor = match &settings.lora_dir {
        Some(dir) => LoraExtractor::with_library(LoraLibrary::scan(dir)),
        None => LoraExtractor::new(),
    };
    let out = extractor.execute(&settings.lora_request(category))?;

    println!("{} {}", "prompt:".dimmed(), out.prompt);
    for (i, (name, weight)) in out.names.iter().zip(out.weights).enumerate() {
        println!("{} {} {}", format!("lora{}:", i + 1).dimmed(), name.cyan(), weight);
    }
    Ok(())
}

fn cmd_select(settings: &Settings, category: &str) -> Result<()> {
    let library = settings.library()?;
    println!("{} {}", "library:".dimmed(), library.root().display());
    let out = LoraSelector::new(library).execute(&settings.lora_request(category))?;

    for (i, (file, strength)) in out.files.iter().zip(out.strengths).enumerate() {
        let file = if file.is_empty() { "None".dimmed() } else { file.cyan() };
        println!("{} {} {}", format!("lora{}:", i + 1).dimmed(), file, strength);
    }
    Ok(())
}

fn cmd_load(settings: &Settings, category: &str, overrides: [Option<String>; 3]) -> Result<()> {
    let library = settings.library()?;
    println!("{} {}", "library:".dimmed(), library.root().display());
    let request = LoraLoaderRequest {
        yaml_path: settings.yaml_path.clone(),
        category: category.to_string(),
        overrides,
    };
    let out = LoraLoader::new(library).execute(&request)?;

    println!("{} {}", "prompt:".dimmed(), out.prompt);
    for (i, name) in out.names.iter().enumerate() {
        println!("{} {}", format!("lora{}:", i + 1).dimmed(), name.cyan());
    }
    Ok(())
}

fn cmd_categories(settings: &Settings) -> Result<()> {
    let configs = CategoryConfigs::load(&settings.yaml_path)?;
    if configs.is_manual() {
        println!(
            "No category file at {}; enter categories by name",
            settings.yaml_path.display()
        );
    } else if configs.is_empty() {
        println!("No categories found");
    } else {
        for name in configs.names() {
            println!("{}", name);
        }
    }
    Ok(())
}

fn cmd_state(path: &Path) -> Result<()> {
    let state = state_file::load(path)?;
    let mut empty = true;
    for category in state.categories() {
        println!("{} {}", category.cyan(), state.peek(category));
        empty = false;
    }
    if empty {
        println!("No counters stored in {}", path.display());
    }
    Ok(())
}

fn cmd_parse_lora(raw: &str) -> Result<()> {
    let parsed = parse_lora(raw)?;
    if parsed.is_empty() {
        println!("{} {}", "(none)".dimmed(), parsed.weight);
    } else {
        println!("{} {}", parsed.name.cyan(), parsed.weight);
    }
    Ok(())
}
