/// display width in pixels
pub const WIDTH: usize = 64;
/// display height in pixels
pub const HEIGHT: usize = 32;
/// bytes per row of the packed framebuffer
const ROW_BYTES: usize = WIDTH / 8;
/// size of the packed framebuffer
pub const FRAMEBUFFER_BYTES: usize = ROW_BYTES * HEIGHT;

/// Monochrome 64x32 display memory, packed one bit per pixel with the MSB as
/// the leftmost pixel of each byte. This is the same layout the COSMAC VIP
/// kept in its display page, and what `Display::draw` expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    bytes: [u8; FRAMEBUFFER_BYTES],
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            bytes: [0; FRAMEBUFFER_BYTES],
        }
    }

    /// turn every pixel off
    pub fn clear(&mut self) {
        self.bytes = [0; FRAMEBUFFER_BYTES];
    }

    /// whether the pixel at (x, y) is on; coordinates wrap
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let (byte, mask) = Self::locate(x, y);
        self.bytes[byte] & mask != 0
    }

    /// XOR an `n`-row, 8-column sprite onto the display with its top-left
    /// corner at (x, y). Both axes wrap. Returns true if any pixel went from
    /// on to off.
    pub fn draw_sprite(&mut self, x: usize, y: usize, rows: &[u8]) -> bool {
        let mut collision = false;
        for (dy, row) in rows.iter().enumerate() {
            for dx in 0..8 {
                if row & (0x80 >> dx) == 0 {
                    continue;
                }
                let (byte, mask) = Self::locate(x + dx, y + dy);
                collision |= self.bytes[byte] & mask != 0;
                self.bytes[byte] ^= mask;
            }
        }
        collision
    }

    pub fn is_blank(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    /// packed pixel data, row by row
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn locate(x: usize, y: usize) -> (usize, u8) {
        let x = x % WIDTH;
        let y = y % HEIGHT;
        (y * ROW_BYTES + x / 8, 0x80 >> (x % 8))
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}
