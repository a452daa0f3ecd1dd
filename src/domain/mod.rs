// Domain layer: data model and ports (interfaces). Core logic depends on these, never the reverse.

pub mod model;
pub mod ports;
