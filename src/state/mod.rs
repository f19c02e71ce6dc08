pub mod encryption;
pub mod key_material;
pub mod session;
pub mod store;
pub mod vault;
