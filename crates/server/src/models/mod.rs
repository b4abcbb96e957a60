pub mod data_import;
pub mod schema_admin;
pub mod submission;
pub mod template;
