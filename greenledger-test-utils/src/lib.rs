pub mod db;
pub mod temp;

pub use db::TestDb;
pub use temp::TempDir;
