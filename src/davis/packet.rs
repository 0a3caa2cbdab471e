/// LOOP packet framing: locating the packet marker in a raw serial buffer
use log::debug;

/// Bytes that open every LOOP packet
pub const LOOP_MARKER: &[u8; 3] = b"LOO";

/// Minimum span from the marker needed to address every decoded field
/// (highest offset used is the console battery high byte at 88)
pub const MIN_FRAME_LEN: usize = 89;

/// A candidate LOOP packet, starting at the marker and at least
/// [`MIN_FRAME_LEN`] bytes long
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Vec<u8>,
}

impl RawFrame {
    /// Wrap bytes that already start at a marker. Returns `None` when the
    /// slice is too short to hold every field.
    pub fn new(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < MIN_FRAME_LEN {
            return None;
        }
        Some(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }

    /// Little-endian 16-bit value: low byte at `offset`, high byte at `offset + 1`
    pub fn word(&self, offset: usize) -> Option<u16> {
        let low = self.byte(offset)?;
        let high = self.byte(offset + 1)?;
        Some(u16::from_le_bytes([low, high]))
    }
}

/// Scan `buffer` left to right for the first marker with enough bytes
/// behind it. `None` means a fresh read is needed.
pub fn scan(buffer: &[u8]) -> Option<RawFrame> {
    let start = (0..buffer.len()).find(|&i| {
        buffer.len() - i >= MIN_FRAME_LEN && buffer[i..].starts_with(LOOP_MARKER)
    })?;

    debug!("Found LOOP marker at offset {} of {}", start, buffer.len());
    RawFrame::new(&buffer[start..])
}
