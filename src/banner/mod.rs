pub mod controller;
pub mod render;
pub mod state;
