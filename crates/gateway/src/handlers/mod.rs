//! API handlers module

pub mod browse;
pub mod countries;
pub mod health;
pub mod posts;
pub mod tags;
