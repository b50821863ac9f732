//! different utility modules used throughout the project
/// logger initialisation (terminal and timestamped file)
pub mod logger;
/// solution table and solve report returned by `solve`
pub mod report;
