pub mod best_level;
pub mod results;
pub mod session;
pub mod stimulus;
pub mod trials;
pub mod variables;
