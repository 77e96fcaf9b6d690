pub mod accounts;
pub mod fillup_records;
pub mod vehicles;

pub mod prelude;
