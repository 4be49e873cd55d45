pub mod collaborators;
pub mod controller;
pub mod loop_worker;

pub use collaborators::{FaceModel, ModelSet, ObjectModel};
pub use controller::SensingController;
pub use loop_worker::{sensing_loop, SensingContext};
