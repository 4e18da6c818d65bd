//! Database operations for organizations and their phones and activity tags.

mod geo;
mod read;
mod types;
mod write;

pub use geo::organizations_by_geo;
pub use read::{
    get_organization, organizations_by_activity, organizations_in_building, organizations_tagged,
    search_organizations,
};
pub use types::{OrganizationRow, PhoneRow, TagRow};
pub use write::{
    add_phone, create_organization, delete_organization, remove_phone, tag_organization,
    untag_organization,
};
