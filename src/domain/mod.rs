// Domain layer: neighborhood labels, result records and the ports the agents talk through.

pub mod classify;
pub mod model;
pub mod ports;
