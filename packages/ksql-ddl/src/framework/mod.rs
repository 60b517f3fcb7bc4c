pub mod column;
pub mod entity;
pub mod hub;
pub mod query;
pub mod role;
pub mod window;
