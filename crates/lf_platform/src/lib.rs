pub mod capability;
pub mod window;
