pub mod entity;
pub mod linked_data;
pub mod links;
pub mod query;
pub mod render;
