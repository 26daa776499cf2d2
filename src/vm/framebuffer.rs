pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Row-major pixel grid, one entry per display cell.
pub type PixelGrid<T> = [[T; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

/// The 64x32 monochrome display buffer.
///
/// Sprites are composited with XOR. The origin of a draw wraps around the
/// display edges, the sprite body does not (COSMAC VIP behavior).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: PixelGrid<bool>,
}

impl Framebuffer {
    pub fn new() -> Self {
        Self {
            pixels: [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        }
    }

    /// Turns every pixel off.
    pub fn clear(&mut self) {
        self.pixels = [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
    }

    /// XOR-composites `sprite` with its top-left corner at (x, y), one
    /// byte per row, most significant bit leftmost.
    ///
    /// Returns true if any lit pixel was turned off (the collision flag).
    pub fn draw(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let x_origin = x as usize % DISPLAY_WIDTH;
        let y_origin = y as usize % DISPLAY_HEIGHT;

        // Clip rows and columns that would run past the display edge
        let row_count = sprite.len().min(DISPLAY_HEIGHT - y_origin);
        let col_count = 8.min(DISPLAY_WIDTH - x_origin);

        let mut collision = false;
        for (row, &sprite_byte) in sprite[..row_count].iter().enumerate() {
            for col in 0..col_count {
                if sprite_byte & (0x80 >> col) != 0 {
                    let pixel = &mut self.pixels[y_origin + row][x_origin + col];
                    *pixel ^= true;

                    if !*pixel {
                        collision = true;
                    }
                }
            }
        }

        collision
    }

    /// State of a single pixel (true = lit).
    pub fn pixel(&self, y: usize, x: usize) -> bool {
        self.pixels[y][x]
    }

    /// Read-only view of the whole grid for renderers.
    pub fn snapshot(&self) -> &PixelGrid<bool> {
        &self.pixels
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}
