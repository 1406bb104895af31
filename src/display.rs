use crate::framebuffer::{FRAMEBUFFER_BYTES, HEIGHT, WIDTH};
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Display is used by the host to put the framebuffer on a screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work. Displays only ever read the frame they're given.
pub trait Display {
    /// draw a packed frame (see `Framebuffer::as_bytes`)
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error>;

    /// how big the display data should be
    fn get_display_size_bytes(&self) -> usize;
}

// width, height, bits per pixel
struct Resolution(usize, usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }
    fn byte_count(&self) -> usize {
        self.0 * self.1 * self.2 / 8
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel whose bit equals `bitplane`
    fn bitplane_from_data<'a>(
        &self,
        data: &'a [u8],
        bitplane: u8,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let mut count = self.pixel_count();
        let w = self.0;
        std::iter::from_fn(move || {
            while count > 0 {
                count -= 1;
                let bit = 1 & (data[count / 8] >> (7 - count % 8));
                if bit == bitplane {
                    return Some((
                        (count % w) as f64,        // x
                        -1.0 * (count / w) as f64, // y
                    ));
                }
            }
            None
        })
    }
}

/// monochrome display in a terminal, rendered using TUI and Crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(WIDTH, HEIGHT, 1),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error> {
        if data.len() != self.resolution.byte_count() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "MonoTermDisplay needs {} bytes per frame, got {}",
                    self.resolution.byte_count(),
                    data.len()
                ),
            ));
        }

        // 1:1 between chip-8 pixels and terminal cells, plus the border
        let resolution = &self.resolution;
        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, 2 + resolution.0 as u16, 2 + resolution.1 as u16);
            let lit = resolution.bitplane_from_data(data, 1).collect::<Vec<_>>();

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &lit,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }

    fn get_display_size_bytes(&self) -> usize {
        self.resolution.byte_count()
    }
}

/// records what it was asked to draw; useful for testing the host loop
#[derive(Default)]
pub struct DummyDisplay {
    pub frames_drawn: usize,
    pub last_frame: Vec<u8>,
}

impl DummyDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error> {
        self.frames_drawn += 1;
        self.last_frame = data.to_vec();
        Ok(())
    }
    fn get_display_size_bytes(&self) -> usize {
        FRAMEBUFFER_BYTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::Framebuffer;

    #[test]
    fn test_pixel_count() {
        let r = Resolution(64, 32, 1);
        assert_eq!(r.pixel_count(), 2048)
    }

    #[test]
    fn test_byte_count_matches_framebuffer() {
        let r = Resolution(WIDTH, HEIGHT, 1);
        assert_eq!(r.byte_count(), FRAMEBUFFER_BYTES);
        assert_eq!(Framebuffer::new().as_bytes().len(), r.byte_count());
    }

    #[test]
    fn test_bounds() {
        let r = Resolution(64, 32, 1);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_blank_frame_has_no_lit_points() {
        let r = Resolution(64, 32, 1);
        assert_eq!(r.bitplane_from_data(&[0; 256], 1).count(), 0);
        assert_eq!(r.bitplane_from_data(&[0; 256], 0).count(), 2048);
    }

    #[test]
    fn test_lit_points_follow_framebuffer() {
        let r = Resolution(64, 32, 1);
        let mut fb = Framebuffer::new();
        fb.draw_sprite(63, 0, &[0x80]);
        fb.draw_sprite(2, 31, &[0x80]);
        let mut lit = r.bitplane_from_data(fb.as_bytes(), 1).collect::<Vec<_>>();
        lit.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(lit, vec![(2.0, -31.0), (63.0, 0.0)]);
    }

    #[test]
    fn test_dummy_display_records_frames() -> Result<(), io::Error> {
        let mut d = DummyDisplay::new();
        d.draw(&[1; 256])?;
        d.draw(&[2; 256])?;
        assert_eq!(d.frames_drawn, 2);
        assert_eq!(d.last_frame, vec![2; 256]);
        assert_eq!(d.get_display_size_bytes(), 256);
        Ok(())
    }
}
