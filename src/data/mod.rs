pub mod class;
pub mod store;
pub mod user;
