// Domain layer: tables, values and the ports (storage, pacing, pipeline) the adapters implement.

pub mod model;
pub mod ports;
