mod schema;

pub use schema::{Column, SqlType, Table, VersionedSchema, BASE_DB_VERSION};
