pub mod reader;
pub mod server;
pub mod telnet;

pub use reader::LineReader;
pub use server::run_tcp_server;
pub use telnet::{IacFilter, LineBuffer, MAX_LINE_LEN};
