//! Demo dataset: five buildings, a two-root taxonomy and seven organizations.
//!
//! Activity names are unique across the whole dataset, so organizations
//! reference them by name and buildings by position in [`BUILDINGS`].

use crate::model::NewBuilding;

pub struct DemoBuilding {
    pub address: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

pub struct DemoActivity {
    pub name: &'static str,
    pub parent: Option<&'static str>,
}

pub struct DemoOrganization {
    pub name: &'static str,
    /// Index into [`BUILDINGS`].
    pub building: usize,
    pub phones: &'static [&'static str],
    pub activities: &'static [&'static str],
}

pub const BUILDINGS: [DemoBuilding; 5] = [
    DemoBuilding {
        address: "г. Москва, ул. Ленина 1, офис 3",
        latitude: 55.7558,
        longitude: 37.6176,
    },
    DemoBuilding {
        address: "г. Екатеринбург, ул. Блюхера, 32/1",
        latitude: 56.8420,
        longitude: 60.6122,
    },
    DemoBuilding {
        address: "г. Санкт-Петербург, Невский проспект 10",
        latitude: 59.9320,
        longitude: 30.3470,
    },
    DemoBuilding {
        address: "г. Казань, ул. Баумана 5",
        latitude: 55.7963,
        longitude: 49.1088,
    },
    DemoBuilding {
        address: "г. Новосибирск, Красный проспект 25",
        latitude: 55.0302,
        longitude: 82.9204,
    },
];

/// Parents always come before their children.
pub const ACTIVITIES: [DemoActivity; 10] = [
    DemoActivity {
        name: "Еда",
        parent: None,
    },
    DemoActivity {
        name: "Автомобили",
        parent: None,
    },
    DemoActivity {
        name: "Мясная продукция",
        parent: Some("Еда"),
    },
    DemoActivity {
        name: "Молочная продукция",
        parent: Some("Еда"),
    },
    DemoActivity {
        name: "Легковые",
        parent: Some("Автомобили"),
    },
    DemoActivity {
        name: "Грузовые",
        parent: Some("Автомобили"),
    },
    DemoActivity {
        name: "Колбасы",
        parent: Some("Мясная продукция"),
    },
    DemoActivity {
        name: "Сыры",
        parent: Some("Молочная продукция"),
    },
    DemoActivity {
        name: "Запчасти",
        parent: Some("Легковые"),
    },
    DemoActivity {
        name: "Аксессуары",
        parent: Some("Легковые"),
    },
];

pub const ORGANIZATIONS: [DemoOrganization; 7] = [
    DemoOrganization {
        name: "ООО \"Рога и Копыта\"",
        building: 1,
        phones: &["2-222-222", "3-333-333", "8-923-666-13-13"],
        activities: &["Мясная продукция", "Молочная продукция"],
    },
    DemoOrganization {
        name: "ИП \"Молочный мир\"",
        building: 0,
        phones: &["8-800-111-22-33"],
        activities: &["Молочная продукция", "Сыры"],
    },
    DemoOrganization {
        name: "ООО \"Мясной двор\"",
        building: 2,
        phones: &["8-495-000-00-01"],
        activities: &["Мясная продукция", "Колбасы"],
    },
    DemoOrganization {
        name: "ООО \"Авто-Лайн\"",
        building: 3,
        phones: &["8-843-100-10-10"],
        activities: &["Легковые", "Аксессуары"],
    },
    DemoOrganization {
        name: "ООО \"Запчасти плюс\"",
        building: 3,
        phones: &["8-843-200-20-20"],
        activities: &["Запчасти"],
    },
    DemoOrganization {
        name: "ООО \"ГрузСервис\"",
        building: 4,
        phones: &["8-383-300-30-30"],
        activities: &["Грузовые"],
    },
    DemoOrganization {
        name: "Кафе \"У дома\"",
        building: 0,
        phones: &["8-495-777-77-77"],
        activities: &["Еда"],
    },
];

impl DemoBuilding {
    #[must_use]
    pub fn to_new_building(&self) -> NewBuilding {
        NewBuilding::new(self.address, self.latitude, self.longitude)
    }
}
