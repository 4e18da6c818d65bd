//! `orgs` command handlers.

use clap::Subcommand;
use orgdir_core::{BoxQuery, GeoQuery, NewOrganization, RadiusQuery};

use crate::{print_json, AppContext};

/// Sub-commands available under `orgs`.
#[derive(Debug, Subcommand)]
pub enum OrgCommands {
    /// Show one organization with its building, phones and activities
    Get { id: i64 },
    /// Create an organization
    Add {
        name: String,
        #[arg(long)]
        building: i64,
        /// Repeat for several phones
        #[arg(long = "phone")]
        phones: Vec<String>,
        /// Repeat for several activity ids
        #[arg(long = "activity")]
        activities: Vec<i64>,
    },
    /// Delete an organization with its phones and tags
    Remove { id: i64 },
    /// Organizations located in a building
    ByBuilding { building_id: i64 },
    /// Organizations tagged with an activity
    ByActivity {
        activity_id: i64,
        /// Also match every activity below it
        #[arg(long)]
        include_descendants: bool,
    },
    /// Case-insensitive substring search on the name
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Organizations within `--radius` meters of a point, nearest first
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
    /// Organizations inside a latitude/longitude rectangle
    Bbox {
        #[arg(long, allow_negative_numbers = true)]
        min_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        max_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        min_lon: f64,
        #[arg(long, allow_negative_numbers = true)]
        max_lon: f64,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Add a phone number
    AddPhone { id: i64, phone: String },
    /// Remove a phone number by its id
    RemovePhone { id: i64, phone_id: i64 },
    /// Tag an organization with an activity
    Tag { id: i64, activity_id: i64 },
    /// Remove an activity tag
    Untag { id: i64, activity_id: i64 },
}

pub(crate) async fn run(ctx: &AppContext, command: OrgCommands) -> anyhow::Result<()> {
    let pool = &ctx.pool;
    match command {
        OrgCommands::Get { id } => match orgdir_db::get_organization(pool, id).await? {
            Some(org) => print_json(&org),
            None => anyhow::bail!("organization {id} not found"),
        },
        OrgCommands::Add {
            name,
            building,
            phones,
            activities,
        } => {
            let org = NewOrganization::new(name, building)
                .with_phones(phones)
                .with_activities(activities);
            print_json(&orgdir_db::create_organization(pool, org).await?)
        }
        OrgCommands::Remove { id } => {
            orgdir_db::delete_organization(pool, id).await?;
            println!("organization {id} deleted");
            Ok(())
        }
        OrgCommands::ByBuilding { building_id } => {
            print_json(&orgdir_db::organizations_in_building(pool, building_id).await?)
        }
        OrgCommands::ByActivity {
            activity_id,
            include_descendants,
        } => print_json(
            &orgdir_db::organizations_by_activity(pool, activity_id, include_descendants).await?,
        ),
        OrgCommands::Search { query, limit } => {
            let limit = limit.unwrap_or(ctx.config.search_limit);
            print_json(&orgdir_db::search_organizations(pool, &query, limit).await?)
        }
        OrgCommands::Near {
            lat,
            lon,
            radius,
            limit,
        } => {
            let query = GeoQuery::Radius(
                RadiusQuery::new(lat, lon, radius).with_limit(limit.unwrap_or(ctx.config.geo_limit)),
            );
            print_json(&orgdir_db::organizations_by_geo(pool, &query).await?)
        }
        OrgCommands::Bbox {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            limit,
        } => {
            let query = GeoQuery::BBox(
                BoxQuery::new(min_lat, max_lat, min_lon, max_lon)
                    .with_limit(limit.unwrap_or(ctx.config.geo_limit)),
            );
            print_json(&orgdir_db::organizations_by_geo(pool, &query).await?)
        }
        OrgCommands::AddPhone { id, phone } => {
            print_json(&orgdir_db::add_phone(pool, id, &phone).await?)
        }
        OrgCommands::RemovePhone { id, phone_id } => {
            orgdir_db::remove_phone(pool, id, phone_id).await?;
            println!("phone {phone_id} removed from organization {id}");
            Ok(())
        }
        OrgCommands::Tag { id, activity_id } => {
            let added = orgdir_db::tag_organization(pool, id, activity_id).await?;
            println!(
                "organization {id} {} activity {activity_id}",
                if added { "tagged with" } else { "already tagged with" }
            );
            Ok(())
        }
        OrgCommands::Untag { id, activity_id } => {
            let removed = orgdir_db::untag_organization(pool, id, activity_id).await?;
            println!(
                "organization {id} {} activity {activity_id}",
                if removed { "untagged from" } else { "was not tagged with" }
            );
            Ok(())
        }
    }
}
