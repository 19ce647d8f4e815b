//! Application layer: services orchestrating domain logic over repositories.

pub mod assistant;
pub mod delivery;
pub mod email;
pub mod error;
pub mod issues;
pub mod newsletters;
pub mod pagination;
pub mod repos;
pub mod subscribers;
