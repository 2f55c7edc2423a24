pub mod analytics;
pub mod captable;
pub mod corporate;
pub mod events;
pub mod health;
