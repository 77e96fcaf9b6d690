use sea_orm_migration::MigrationTrait;

mod m20250101_000001_create_accounts_table;
mod m20250101_000002_create_vehicles_table;
mod m20250101_000003_create_fillup_records_table;
mod m20250101_000004_add_initial_mileage_to_vehicles;
mod m20250101_000005_add_live_row_indexes;

/// Canonical, fixed-order list of migration units
pub struct Migrator;

impl Migrator {
    /// Units in application order. Rollback walks this list backwards.
    pub fn units() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_accounts_table::Migration),
            Box::new(m20250101_000002_create_vehicles_table::Migration),
            Box::new(m20250101_000003_create_fillup_records_table::Migration),
            Box::new(m20250101_000004_add_initial_mileage_to_vehicles::Migration),
            Box::new(m20250101_000005_add_live_row_indexes::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm_migration::MigrationName;

    #[test]
    fn test_unit_names_sort_in_declaration_order() {
        let names: Vec<String> = Migrator::units()
            .iter()
            .map(|unit| unit.name().to_string())
            .collect();

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 5);
        assert_eq!(names[0], "m20250101_000001_create_accounts_table");
    }
}
