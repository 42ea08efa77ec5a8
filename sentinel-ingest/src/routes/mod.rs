pub mod bots;
pub mod events;
pub mod patterns;
pub mod sessions;
