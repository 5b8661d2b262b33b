pub mod collectors;
pub mod crawler;
