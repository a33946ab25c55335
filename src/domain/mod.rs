// Domain layer: experiment models and ports (interfaces).

pub mod model;
pub mod ports;
