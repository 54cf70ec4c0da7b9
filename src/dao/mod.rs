//! Persistence seam: entity models, the repository trait, and the in-memory backend.

pub mod memory;
pub mod models;
pub mod repository;
