//! gridclip - subset gridded NetCDF variables against a polygon
//!
//! This is the main entry point for the gridclip application. It prints a
//! JSON summary of the selected cells to stdout.

use serde_json::json;
use std::time::Instant;
use tracing::{error, info};

use gridclip::data_loader::load_netcdf;
use gridclip::query::{parse_bbox, parse_ring};
use gridclip::{
    generate_operation_id, init_tracing, log_error, log_operation_end, log_operation_start,
    log_selection_stats, Config, DatasetInterface, Result, SelectOptions,
};

fn main() -> Result<()> {
    // Load configuration
    let (config, request) = Config::load()?;

    init_tracing(&config.log_level);
    info!("Starting gridclip v{}", env!("CARGO_PKG_VERSION"));

    // Validate configuration
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let run_id = generate_operation_id();
    let start = Instant::now();
    log_operation_start("gridclip", Some(&run_id));

    info!("Loading NetCDF file: {:?}", request.netcdf_file);
    let dataset = load_netcdf(&request.netcdf_file).map_err(|e| {
        log_error(&e, "loading NetCDF file");
        e
    })?;

    let iface = DatasetInterface::open(&dataset, &request.variable, &config.overrides).map_err(|e| {
        log_error(&e, "opening dataset interface");
        e
    })?;

    let query = match (&request.bbox, &request.polygon) {
        (Some(bbox), _) => Some(parse_bbox(bbox)?),
        (None, Some(ring)) => Some(parse_ring(ring)?),
        (None, None) => None,
    };

    let options = SelectOptions::from_config(&config.selection)?;
    let mut selection = match &query {
        Some(polygon) => iface.select(polygon, &options).map_err(|e| {
            log_error(&e, "selecting cells");
            e
        })?,
        None => iface.select_all(),
    };
    log_selection_stats(&request.variable, iface.grid(), &selection);

    let wrapped = iface.grid().wrap_state().is_wrapped;
    if wrapped && config.selection.vector_wrap {
        selection = selection.wrap()?;
    }

    let grid = iface.grid();
    let (rows, cols) = grid.shape();
    let envelope = selection
        .envelope()
        .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]);
    let cells: Vec<[usize; 2]> = selection.cells().map(|(i, j)| [i, j]).collect();

    let summary = json!({
        "file": request.netcdf_file.display().to_string(),
        "variable": iface.target(),
        "shape": [rows, cols],
        "abstraction": grid.abstraction(),
        "wrapped": wrapped,
        "operation": options.operation,
        "axes": iface.dim_map(),
        "time_steps": iface.temporal().axis.len(),
        "calendar": iface.temporal().calendar.map(|c| c.to_string()),
        "selected": selection.len(),
        "envelope": envelope,
        "cells": cells,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    log_operation_end("gridclip", start, true);
    Ok(())
}
