pub mod bird;
pub mod collider;
pub mod constants;
pub mod gate;
pub mod simulation;
pub mod snapshot;
