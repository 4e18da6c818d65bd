//! `activities` command handlers.

use clap::Subcommand;

use crate::{print_json, AppContext};

/// Sub-commands available under `activities`.
#[derive(Debug, Subcommand)]
pub enum ActivityCommands {
    /// Print the whole taxonomy as a nested tree
    Tree,
    /// Add an activity, as a root unless `--parent` is given
    Add {
        name: String,
        #[arg(long)]
        parent: Option<i64>,
    },
    /// Re-parent an activity and everything below it
    Move {
        id: i64,
        #[arg(long, conflicts_with = "root", required_unless_present = "root")]
        parent: Option<i64>,
        /// Make the activity a root
        #[arg(long)]
        root: bool,
    },
    /// Delete an activity; its children become roots
    Remove { id: i64 },
    /// List the ids under an activity
    Subtree {
        id: i64,
        /// Include the activity itself
        #[arg(long)]
        include_self: bool,
    },
}

pub(crate) async fn run(ctx: &AppContext, command: ActivityCommands) -> anyhow::Result<()> {
    let pool = &ctx.pool;
    match command {
        ActivityCommands::Tree => print_json(&orgdir_db::activity_tree(pool).await?),
        ActivityCommands::Add { name, parent } => {
            print_json(&orgdir_db::insert_activity(pool, &name, parent).await?)
        }
        ActivityCommands::Move { id, parent, .. } => {
            print_json(&orgdir_db::move_activity(pool, id, parent).await?)
        }
        ActivityCommands::Remove { id } => {
            print_json(&orgdir_db::delete_activity(pool, id).await?)
        }
        ActivityCommands::Subtree { id, include_self } => {
            print_json(&orgdir_db::activity_subtree_ids(pool, id, include_self).await?)
        }
    }
}
