pub mod interface;
pub mod model;
