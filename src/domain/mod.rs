// Domain layer: entity models and ports (interfaces) implemented by the adapters in core/ and config/.

pub mod model;
pub mod ports;
