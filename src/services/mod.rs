pub mod executor;
pub mod feedback;
pub mod planner;
