//! `buildings` command handlers.

use clap::Subcommand;
use orgdir_core::{GeoQuery, NewBuilding, RadiusQuery};

use crate::{print_json, AppContext};

/// Sub-commands available under `buildings`.
#[derive(Debug, Subcommand)]
pub enum BuildingCommands {
    /// List every building
    List,
    /// Add a building
    Add {
        address: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Delete a building no organization references
    Remove { id: i64 },
    /// Buildings within `--radius` meters of a point, nearest first
    Near {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long, allow_negative_numbers = true)]
        radius: f64,
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub(crate) async fn run(ctx: &AppContext, command: BuildingCommands) -> anyhow::Result<()> {
    let pool = &ctx.pool;
    match command {
        BuildingCommands::List => print_json(&orgdir_db::list_buildings(pool).await?),
        BuildingCommands::Add { address, lat, lon } => {
            let building = NewBuilding::new(address, lat, lon);
            print_json(&orgdir_db::insert_building(pool, building).await?)
        }
        BuildingCommands::Remove { id } => {
            orgdir_db::delete_building(pool, id).await?;
            println!("building {id} deleted");
            Ok(())
        }
        BuildingCommands::Near {
            lat,
            lon,
            radius,
            limit,
        } => {
            let query = GeoQuery::Radius(
                RadiusQuery::new(lat, lon, radius).with_limit(limit.unwrap_or(ctx.config.geo_limit)),
            );
            print_json(&orgdir_db::buildings_by_geo(pool, &query).await?)
        }
    }
}
