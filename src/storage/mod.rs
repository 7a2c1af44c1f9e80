pub mod bplus_tree;
pub mod database;
pub mod index;
pub mod table;
