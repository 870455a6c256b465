mod encoder;

pub use encoder::{AssignmentEncoder, AssignmentState};
