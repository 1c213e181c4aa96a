//! CLI argument parsing for yamlcycler

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "yc")]
#[command(author, version, about = "Cycle category images with their prompt, LoRAs and masks", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Category YAML file (overrides config)
    #[arg(short = 'y', long = "yaml", global = true)]
    pub yaml_path: Option<PathBuf>,

    /// Directory with one image folder per category (overrides config)
    #[arg(short = 'p', long, global = true)]
    pub parent_dir: Option<PathBuf>,

    /// Directory with LoRA model files (overrides config)
    #[arg(long, global = true)]
    pub lora_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by the cycling commands
#[derive(Args, Debug, Clone)]
pub struct CycleArgs {
    /// Category to cycle
    #[arg(required = true)]
    pub category: String,

    /// Number of images to step through
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,

    /// JSON file to keep cycle counters in between runs
    #[arg(short, long)]
    pub state: Option<PathBuf>,

    /// Write the last resolved mask to this image file
    #[arg(short, long)]
    pub mask_out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full cycler (image, mask, prompt, LoRA tags)
    Next(CycleArgs),

    /// Run the simple cycler (image and mask)
    Simple(CycleArgs),

    /// Extract LoRA names and weights for a category
    Loras {
        /// Category to read
        #[arg(required = true)]
        category: String,
    },

    /// Match a category's LoRAs against the LoRA directory
    Select {
        /// Category to read
        #[arg(required = true)]
        category: String,
    },

    /// Resolve a category's LoRA names against the LoRA directory
    Load {
        /// Category to read
        #[arg(required = true)]
        category: String,

        /// Use this LoRA name for slot 1 instead of the YAML tag
        #[arg(long)]
        override1: Option<String>,

        /// Use this LoRA name for slot 2 instead of the YAML tag
        #[arg(long)]
        override2: Option<String>,

        /// Use this LoRA name for slot 3 instead of the YAML tag
        #[arg(long)]
        override3: Option<String>,
    },

    /// List categories in the YAML file
    Categories,

    /// Show the counters stored in a state file
    State {
        /// JSON state file written by --state
        #[arg(required = true)]
        path: PathBuf,
    },

    /// Parse a single LoRA tag
    ParseLora {
        /// Tag such as "<lora:name:0.8>"
        #[arg(required = true, allow_hyphen_values = true)]
        raw: String,
    },

    /// List available node types
    Nodes,
}
