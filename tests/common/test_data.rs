//! Test data generation utilities.
//!
//! This module builds datasets with known grids, either in memory or as
//! NetCDF files, for the integration tests.

#![allow(dead_code)]

use gridclip::{MemoryDataset, Result};
#[cfg(feature = "netcdf")]
use std::path::Path;

/// Coordinates and bounds of `n` equal cells spanning `[start, start + extent]`
pub fn cells(start: f64, extent: f64, n: usize) -> (Vec<f64>, Vec<f64>) {
    let width = extent / n as f64;
    let centres = (0..n).map(|i| start + (i as f64 + 0.5) * width).collect();
    let bounds = (0..n)
        .flat_map(|i| [start + i as f64 * width, start + (i as f64 + 1.0) * width])
        .collect();
    (centres, bounds)
}

/// A global `nlat` x `nlon` grid with bounds on both axes and explicit
/// `axis` attributes. Longitudes run over 0..360 when `wrapped`, otherwise
/// over -180..180.
pub fn global_grid(nlon: usize, nlat: usize, wrapped: bool) -> Result<MemoryDataset> {
    let lon_start = if wrapped { 0.0 } else { -180.0 };
    let (lon, lon_bnds) = cells(lon_start, 360.0, nlon);
    let (lat, lat_bnds) = cells(-90.0, 180.0, nlat);

    let mut ds = MemoryDataset::new();
    ds.add_dimension("time", 2)
        .add_dimension("lat", nlat)
        .add_dimension("lon", nlon)
        .add_dimension("bnds", 2);

    ds.add_variable("time", &["time"], vec![0.0, 31.0])?;
    ds.add_attribute("time", "axis", "T")?;
    ds.add_attribute("time", "units", "days since 2000-01-01 00:00:00")?;
    ds.add_attribute("time", "calendar", "standard")?;

    ds.add_variable("lat", &["lat"], lat)?;
    ds.add_variable("lat_bnds", &["lat", "bnds"], lat_bnds)?;
    ds.add_attribute("lat", "axis", "Y")?;
    ds.add_attribute("lat", "bounds", "lat_bnds")?;

    ds.add_variable("lon", &["lon"], lon)?;
    ds.add_variable("lon_bnds", &["lon", "bnds"], lon_bnds)?;
    ds.add_attribute("lon", "axis", "X")?;
    ds.add_attribute("lon", "bounds", "lon_bnds")?;

    ds.add_variable("tas", &["time", "lat", "lon"], vec![273.15; 2 * nlat * nlon])?;
    ds.add_attribute("tas", "units", "K")?;

    Ok(ds)
}

/// A 4-D variable whose coordinates carry no `axis` attributes, so every
/// axis has to be guessed from position.
pub fn heuristic_4d_dataset() -> Result<MemoryDataset> {
    let (lat, lat_bnds) = cells(-10.0, 20.0, 4);
    let (lon, lon_bnds) = cells(100.0, 30.0, 6);

    let mut ds = MemoryDataset::new();
    ds.add_dimension("time", 3)
        .add_dimension("plev", 2)
        .add_dimension("lat", 4)
        .add_dimension("lon", 6)
        .add_dimension("bnds", 2);

    ds.add_variable("time", &["time"], vec![0.0, 1.0, 2.0])?;
    ds.add_attribute("time", "units", "hours since 1990-06-01")?;
    ds.add_attribute("time", "calendar", "proleptic_gregorian")?;
    ds.add_variable("plev", &["plev"], vec![100000.0, 85000.0])?;
    ds.add_variable("lat", &["lat"], lat)?;
    ds.add_variable("lat_bnds", &["lat", "bnds"], lat_bnds)?;
    ds.add_attribute("lat", "bnds", "lat_bnds")?;
    ds.add_variable("lon", &["lon"], lon)?;
    ds.add_variable("lon_bnds", &["lon", "bnds"], lon_bnds)?;
    ds.add_attribute("lon", "bounds", "lon_bnds")?;
    ds.add_variable("ta", &["time", "plev", "lat", "lon"], vec![250.0; 3 * 2 * 4 * 6])?;

    Ok(ds)
}

/// Write the same layout as [`global_grid`] to a NetCDF file.
#[cfg(feature = "netcdf")]
pub fn create_global_grid_nc(
    path: &Path,
    nlon: usize,
    nlat: usize,
    wrapped: bool,
) -> std::result::Result<(), netcdf::Error> {
    let lon_start = if wrapped { 0.0 } else { -180.0 };
    let (lon_values, lon_bnds) = cells(lon_start, 360.0, nlon);
    let (lat_values, lat_bnds) = cells(-90.0, 180.0, nlat);

    let mut file = netcdf::create(path)?;

    file.add_dimension("time", 2)?;
    file.add_dimension("lat", nlat)?;
    file.add_dimension("lon", nlon)?;
    file.add_dimension("bnds", 2)?;

    file.add_attribute("title", "Global Grid Test Data")?;
    file.add_attribute("institution", "gridclip test suite")?;

    // Add and configure the time variable
    {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("axis", "T")?;
        time_var.put_attribute("units", "days since 2000-01-01 00:00:00")?;
        time_var.put_attribute("calendar", "standard")?;
        time_var.put_values(&[0.0, 31.0], &[..])?;
    }

    // Add and configure the lat variable
    {
        let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
        lat_var.put_attribute("axis", "Y")?;
        lat_var.put_attribute("units", "degrees_north")?;
        lat_var.put_attribute("bounds", "lat_bnds")?;
        lat_var.put_values(&lat_values, &[..])?;
    }
    {
        let mut bnds_var = file.add_variable::<f64>("lat_bnds", &["lat", "bnds"])?;
        bnds_var.put_values(&lat_bnds, &[..])?;
    }

    // Add and configure the lon variable
    {
        let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
        lon_var.put_attribute("axis", "X")?;
        lon_var.put_attribute("units", "degrees_east")?;
        lon_var.put_attribute("bounds", "lon_bnds")?;
        lon_var.put_values(&lon_values, &[..])?;
    }
    {
        let mut bnds_var = file.add_variable::<f64>("lon_bnds", &["lon", "bnds"])?;
        bnds_var.put_values(&lon_bnds, &[..])?;
    }

    // Add the data variable
    {
        let data: Vec<f32> = (0..2 * nlat * nlon).map(|i| 250.0 + (i % 50) as f32).collect();
        let mut tas_var = file.add_variable::<f32>("tas", &["time", "lat", "lon"])?;
        tas_var.put_attribute("units", "K")?;
        tas_var.put_attribute("long_name", "Near-Surface Air Temperature")?;
        tas_var.put_values(&data, &[..])?;
    }

    Ok(())
}
