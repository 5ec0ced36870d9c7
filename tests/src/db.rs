pub mod mongodb;
pub mod postgresql;
pub mod sqlite;
