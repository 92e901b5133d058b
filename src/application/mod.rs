pub mod compositor;
pub mod dto;
pub mod overlay;
pub mod ports;
pub mod services;
