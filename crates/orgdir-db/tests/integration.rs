//! Offline tests for orgdir-db pool configuration and row conversions.
//! These tests do not require a live database connection.

use orgdir_core::membership::{OrganizationRecord, PhoneRecord, TagRecord};
use orgdir_core::{Activity, AppConfig, Building, Environment};
use orgdir_db::{ActivityRow, BuildingRow, OrganizationRow, PhoneRow, PoolConfig, TagRow};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        seed_data: false,
        search_limit: 50,
        geo_limit: 200,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn activity_row_converts_depth() {
    let activity = Activity::from(ActivityRow {
        id: 7,
        name: "Колбасы".to_string(),
        parent_id: Some(3),
        depth: 3,
    });

    assert_eq!(activity.id, 7);
    assert_eq!(activity.parent_id, Some(3));
    assert_eq!(activity.depth, 3);
}

#[test]
fn activity_row_with_negative_depth_saturates() {
    let activity = Activity::from(ActivityRow {
        id: 1,
        name: "broken".to_string(),
        parent_id: None,
        depth: -1,
    });
    assert_eq!(activity.depth, u8::MAX);
}

#[test]
fn building_row_converts() {
    let building = Building::from(BuildingRow {
        id: 4,
        address: "г. Казань, ул. Баумана 5".to_string(),
        latitude: 55.7963,
        longitude: 49.1088,
    });

    assert_eq!(building.id, 4);
    assert!((building.latitude - 55.7963).abs() < f64::EPSILON);
    assert!((building.longitude - 49.1088).abs() < f64::EPSILON);
}

#[test]
fn organization_rows_convert_to_records() {
    let org = OrganizationRecord::from(OrganizationRow {
        id: 2,
        name: "ИП \"Молочный мир\"".to_string(),
        building_id: 1,
    });
    assert_eq!(org.id, 2);
    assert_eq!(org.building_id, 1);

    let phone = PhoneRecord::from(PhoneRow {
        id: 10,
        organization_id: 2,
        phone: "8-800-111-22-33".to_string(),
    });
    assert_eq!(phone.organization_id, 2);
    assert_eq!(phone.id, 10);
    assert_eq!(phone.phone, "8-800-111-22-33");
}

#[test]
fn tag_row_carries_the_full_activity() {
    let tag = TagRecord::from(TagRow {
        organization_id: 2,
        id: 8,
        name: "Сыры".to_string(),
        parent_id: Some(4),
        depth: 3,
    });

    assert_eq!(tag.organization_id, 2);
    assert_eq!(
        tag.activity,
        Activity {
            id: 8,
            name: "Сыры".to_string(),
            parent_id: Some(4),
            depth: 3,
        }
    );
}
