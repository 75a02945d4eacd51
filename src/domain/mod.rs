// Domain layer: block model, violations and ports (interfaces).

pub mod model;
pub mod ports;
