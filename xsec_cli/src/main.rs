use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::info;
use xsec::config::Config;
use xsec::container::Container;
use xsec::grid::write_reference_grid;
use xsec::markers::write_vertical_markers;
use xsec::polygons::{write_polygon_intersections, PolygonIntersectParams};
use xsec::profile::write_raster_profiles;
use xsec::wells::{write_well_data, WellDataParams};

#[derive(Parser)]
#[command(name = "xsec", version, about = "Cross-section display geometry tools")]
struct Cli {
    /// JSON file overriding the built-in tool parameters
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate elevation and coordinate reference gridlines
    ReferenceGrid {
        /// Directory container holding the GeoJSON datasets
        container: PathBuf,
        /// Cross-section trace dataset
        traces: String,
    },
    /// Clip statewide well data to the traces and attach trace attributes
    WellData {
        container: PathBuf,
        traces: String,
        /// Statewide well point dataset
        well_points: String,
        /// Statewide stratigraphy point dataset
        #[arg(long)]
        stratigraphy: Option<String>,
        /// Statewide construction interval table
        #[arg(long)]
        construction: Option<String>,
    },
    /// Drape raster surfaces along the traces into profile classes
    RasterProfiles {
        container: PathBuf,
        traces: String,
        /// ESRI ASCII grid files to profile
        #[arg(required = true)]
        rasters: Vec<PathBuf>,
    },
    /// Intersect map-view polygons with surface profiles in section view
    PolygonIntersect {
        container: PathBuf,
        traces: String,
        /// 3D profile dataset carrying the trace identifier
        profiles: String,
        /// Polygon dataset to intersect
        polygons: String,
    },
    /// Place vertical marker lines where features meet the traces
    VerticalMarkers {
        container: PathBuf,
        traces: String,
        /// Point, line or polygon dataset to mark
        input: String,
    },
}

fn run(cli: Cli) -> xsec::Result<()> {
    let cfg = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    match cli.command {
        Command::ReferenceGrid { container, traces } => {
            let container = Container::open(&container)?;
            let (elevation, coordinate) =
                write_reference_grid(&container, &traces, &cfg.id_field, &cfg.grid)?;
            info!("wrote {elevation} and {coordinate}");
        }
        Command::WellData {
            container,
            traces,
            well_points,
            stratigraphy,
            construction,
        } => {
            let container = Container::open(&container)?;
            let stratigraphy = stratigraphy
                .or_else(|| cfg.wells.stratigraphy.then(|| "loc_wells_strat".to_string()));
            let construction = construction
                .or_else(|| cfg.wells.construction.then(|| "loc_wells_c5c2".to_string()));
            let params = WellDataParams {
                traces: &traces,
                well_points: &well_points,
                stratigraphy: stratigraphy.as_deref(),
                construction: construction.as_deref(),
            };
            write_well_data(&container, &params, &cfg.wells)?;
            info!("wrote wwpt and related tables");
        }
        Command::RasterProfiles {
            container,
            traces,
            rasters,
        } => {
            let container = Container::open(&container)?;
            let outputs = write_raster_profiles(
                &container,
                &traces,
                &rasters,
                &cfg.id_field,
                cfg.grid.vertical_exaggeration,
            )?;
            for (profiles3d, profiles2d) in outputs {
                info!("wrote {profiles3d} and {profiles2d}");
            }
        }
        Command::PolygonIntersect {
            container,
            traces,
            profiles,
            polygons,
        } => {
            let container = Container::open(&container)?;
            let params = PolygonIntersectParams {
                traces: &traces,
                profiles: &profiles,
                polygons: &polygons,
            };
            let (lines, points) = write_polygon_intersections(
                &container,
                &params,
                &cfg.id_field,
                cfg.grid.vertical_exaggeration,
            )?;
            info!("wrote {lines} and {points}");
        }
        Command::VerticalMarkers {
            container,
            traces,
            input,
        } => {
            let container = Container::open(&container)?;
            let name = write_vertical_markers(
                &container,
                &traces,
                &input,
                &cfg.id_field,
                &cfg.markers,
                cfg.grid.vertical_exaggeration,
            )?;
            info!("wrote {name}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let started = Instant::now();
    match run(cli) {
        Ok(()) => {
            info!(
                "finished at {} ({:.1} s elapsed)",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                started.elapsed().as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
