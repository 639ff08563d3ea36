// src/io/serial/mod.rs
//
// Serial link to the water-quality sensor: newline framing over a raw byte
// stream, plus session lifecycle (bounded connect retries, polled reads,
// release-on-drop).

pub mod framer;
mod session;

pub use framer::LineFramer;
pub use session::{list_ports, SerialPortSummary, SerialSession};
