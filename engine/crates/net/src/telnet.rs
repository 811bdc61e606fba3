const IAC: u8 = 255;
const WILL: u8 = 251;
const WONT: u8 = 252;
const DO: u8 = 253;
const DONT: u8 = 254;
const SB: u8 = 250;
const SE: u8 = 240;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum IacState {
    #[default]
    Data,
    Iac,
    Option,
    Sub,
    SubIac,
}

/// Removes Telnet command sequences from a byte stream.
///
/// State carries across calls, so a sequence split over two reads is still
/// recognized.
#[derive(Debug, Default)]
pub struct IacFilter {
    state: IacState,
}

impl IacFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; returns it back if it is payload.
    pub fn push(&mut self, byte: u8) -> Option<u8> {
        let (next, out) = match (self.state, byte) {
            (IacState::Data, IAC) => (IacState::Iac, None),
            (IacState::Data, b) => (IacState::Data, Some(b)),
            // Escaped 0xff is a literal byte.
            (IacState::Iac, IAC) => (IacState::Data, Some(IAC)),
            (IacState::Iac, WILL | WONT | DO | DONT) => (IacState::Option, None),
            (IacState::Iac, SB) => (IacState::Sub, None),
            (IacState::Iac, _) => (IacState::Data, None),
            (IacState::Option, _) => (IacState::Data, None),
            (IacState::Sub, IAC) => (IacState::SubIac, None),
            (IacState::Sub, _) => (IacState::Sub, None),
            (IacState::SubIac, SE) => (IacState::Data, None),
            (IacState::SubIac, _) => (IacState::Sub, None),
        };
        self.state = next;
        out
    }
}

/// Default cap on a single input line, in bytes.
pub const MAX_LINE_LEN: usize = 4096;

/// Splits Telnet input into lines on `\n`, dropping `\r` and command
/// sequences. Bytes past `max_line_len` are discarded until the next newline.
#[derive(Debug)]
pub struct LineBuffer {
    filter: IacFilter,
    buf: Vec<u8>,
    max_line_len: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::with_max_line_len(MAX_LINE_LEN)
    }

    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            filter: IacFilter::new(),
            buf: Vec::new(),
            max_line_len: max_line_len.max(1),
        }
    }

    /// Feed raw bytes, appending every completed line to `lines`.
    pub fn feed_into(&mut self, data: &[u8], lines: &mut impl Extend<String>) {
        for &raw in data {
            let Some(byte) = self.filter.push(raw) else {
                continue;
            };
            match byte {
                b'\n' => {
                    let bytes = std::mem::take(&mut self.buf);
                    lines.extend(Some(String::from_utf8_lossy(&bytes).into_owned()));
                }
                b'\r' => {}
                b if self.buf.len() < self.max_line_len => self.buf.push(b),
                _ => {}
            }
        }
    }

    /// Feed raw bytes and return the completed lines.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        self.feed_into(data, &mut lines);
        lines
    }

    /// Bytes of the line still waiting for its newline.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
