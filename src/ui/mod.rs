pub mod plots;
pub mod stimulus;
pub mod windows;
