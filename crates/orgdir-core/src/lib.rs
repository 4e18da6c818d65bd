//! Domain model and pure engines for the organization directory.
//!
//! The crate owns the invariants: the activity taxonomy (`taxonomy`), the
//! great-circle ranking used by geo search (`geo`), and the literal substring
//! matching used by name search (`search`). Persistence backends call into
//! these engines instead of re-implementing the checks.

pub mod app_config;
pub mod config;
pub mod demo;
pub mod error;
pub mod geo;
pub mod membership;
pub mod memory;
pub mod model;
pub mod search;
pub mod taxonomy;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, DirectoryError, ErrorKind};
pub use geo::{
    bounding_box, haversine_meters, query_box, query_radius, BoundingBox, BoxQuery, GeoMatch,
    GeoQuery, Located, RadiusQuery,
};
pub use membership::{assemble_organizations, resolve_activity_ids};
pub use memory::MemoryDirectory;
pub use model::{Building, NewBuilding, NewOrganization, Organization, Phone};
pub use taxonomy::{Activity, ActivityTree, ActivityTreeNode, NodeUpdate, MAX_DEPTH};

pub type Result<T, E = DirectoryError> = std::result::Result<T, E>;
