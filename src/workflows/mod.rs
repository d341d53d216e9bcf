pub mod acceptance;
pub mod geometry;
