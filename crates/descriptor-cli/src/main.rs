//! Descriptor command line
//!
//! - `descriptor export <snapshot.json>` - write a robot description
//! - `descriptor preview <snapshot.json>` - list the joints that would be used
//! - `descriptor config` - print the default configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use descriptor_core::{Configuration, DesignSnapshot, LengthUnit, describe, preview_joints, write_bundle};

#[derive(Parser)]
#[command(name = "descriptor")]
#[command(about = "Convert CAD assembly snapshots into URDF descriptions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and write the description of a design snapshot
    Export {
        /// Design snapshot (JSON)
        #[arg(name = "SNAPSHOT")]
        snapshot: PathBuf,

        /// Configuration file (RON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Robot name, overrides the configuration
        #[arg(long)]
        robot_name: Option<String>,

        /// Target length unit: mm, cm or m
        #[arg(long, value_parser = parse_unit)]
        target_units: Option<LengthUnit>,

        /// One mesh per body
        #[arg(long)]
        sub_mesh: bool,

        /// Write the mesh manifest
        #[arg(long)]
        save_mesh: bool,
    },

    /// Print the joint records of a design snapshot
    Preview {
        #[arg(name = "SNAPSHOT")]
        snapshot: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration
    Config,
}

fn parse_unit(symbol: &str) -> Result<LengthUnit, String> {
    LengthUnit::from_symbol(symbol).ok_or_else(|| format!("unknown unit '{symbol}', expected mm, cm or m"))
}

fn load_config(path: Option<&PathBuf>) -> Result<Configuration> {
    match path {
        Some(path) => Configuration::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => Ok(Configuration::default()),
    }
}

fn load_snapshot(path: &PathBuf) -> Result<DesignSnapshot> {
    DesignSnapshot::load(path).with_context(|| format!("Failed to load snapshot {}", path.display()))
}

fn main() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "descriptor_core=info,descriptor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            snapshot,
            config,
            out,
            robot_name,
            target_units,
            sub_mesh,
            save_mesh,
        } => {
            let mut config = load_config(config.as_ref())?;
            if robot_name.is_some() {
                config.robot_name = robot_name;
            }
            if let Some(unit) = target_units {
                config.target_units = unit;
            }
            config.sub_mesh |= sub_mesh;
            config.save_mesh |= save_mesh;

            let mut document = load_snapshot(&snapshot)?;
            let description = describe(&mut document, &config)?;
            let paths = write_bundle(&description, &out, config.save_mesh)?;

            print!("{}", description.tree_summary());
            for path in paths.iter() {
                println!("wrote {}", path.display());
            }
            if !description.warnings.is_empty() {
                println!("{} warnings:", description.warnings.len());
                for warning in &description.warnings {
                    println!("  {warning}");
                }
            }
        }

        Commands::Preview { snapshot, config } => {
            let config = load_config(config.as_ref())?;
            let document = load_snapshot(&snapshot)?;
            for record in preview_joints(&document, &config)? {
                println!(
                    "{} ({}): {} -> {}",
                    record.name,
                    record.kind.urdf_type(),
                    record.parent,
                    record.child
                );
            }
        }

        Commands::Config => {
            print!("{}", Configuration::default().to_ron()?);
        }
    }

    Ok(())
}
