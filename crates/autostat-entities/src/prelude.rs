pub use super::accounts::Entity as Accounts;
pub use super::fillup_records::Entity as FillupRecords;
pub use super::vehicles::Entity as Vehicles;
