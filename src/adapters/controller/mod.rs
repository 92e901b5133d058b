pub mod http_link;
pub mod serial_link;
