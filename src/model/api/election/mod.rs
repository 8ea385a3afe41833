mod desc;
mod spec;

pub use desc::ElectionDescription;
pub use spec::{ElectionPatch, ElectionSpec};
