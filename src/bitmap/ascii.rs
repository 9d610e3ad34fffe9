use super::PixelGrid;
use crate::error::ConfigError;

/// Renders a [`PixelGrid`] as text, one character per pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AsciiRenderer {
    on: char,
    off: char,
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self { on: '#', off: '.' }
    }
}

impl AsciiRenderer {
    pub fn new(on: &str, off: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            on: single_char("on", on)?,
            off: single_char("off", off)?,
        })
    }

    pub fn render(&self, grid: &PixelGrid) -> String {
        let mut out = String::with_capacity((grid.width() + 1) * grid.height());
        for (y, row) in grid.rows().enumerate() {
            if y > 0 {
                out.push('\n');
            }
            out.extend(row.iter().map(|&p| if p { self.on } else { self.off }));
        }
        out
    }
}

pub fn render(grid: &PixelGrid, on: &str, off: &str) -> Result<String, ConfigError> {
    Ok(AsciiRenderer::new(on, off)?.render(grid))
}

fn single_char(which: &'static str, value: &str) -> Result<char, ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConfigError::InvalidGlyph {
            which,
            value: value.to_string(),
        }),
    }
}
