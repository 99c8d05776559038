//! Print the discovered axes of a variable in a NetCDF file.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use gridclip::axis::{discover, AxisEntry};
use gridclip::data_loader::load_netcdf;
use gridclip::Dataset;

#[derive(Parser, Debug)]
#[command(name = "inspect_axes", about = "Show how gridclip maps a variable's dimensions to axes")]
struct Args {
    /// NetCDF file to inspect
    file: PathBuf,

    /// Variable whose axes to discover
    variable: String,

    /// Print the dimension map as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let dataset = load_netcdf(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    let map = discover(&dataset, &args.variable)
        .with_context(|| format!("Failed to discover axes of '{}'", args.variable))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    println!("Inspecting variable: {}", args.variable);
    println!(
        "Dimensions: {}",
        dataset.get_dimension_names(&args.variable)?.join(", ")
    );

    println!("\nAxes:");
    for (tag, entry) in map.iter() {
        match entry {
            AxisEntry::Present { variable, bounds } => {
                let len = dataset
                    .get_variable(variable)
                    .and_then(|v| v.shape.first().copied())
                    .unwrap_or(0);
                println!(
                    "  {} = {} (len {}), bounds: {}",
                    tag,
                    variable,
                    len,
                    bounds.as_deref().unwrap_or("none")
                );
            }
            AxisEntry::Absent => println!("  {} = absent", tag),
        }
    }

    if !map.warnings().is_empty() {
        println!("\nWarnings:");
        for warning in map.warnings() {
            println!("  {}", warning);
        }
    }

    Ok(())
}
