// Domain layer: place/group/matrix types and the routing port.

pub mod matrix;
pub mod model;
pub mod ports;
