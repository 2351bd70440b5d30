pub mod animation;
pub mod color;
pub mod input;
pub mod time;
pub mod tunable;
