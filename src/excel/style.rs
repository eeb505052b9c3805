use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    pub fn to_u32(self) -> u32 {
        ((self.0 as u32) << 16) | ((self.1 as u32) << 8) | self.2 as u32
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellStyle {
    pub fill: Option<Rgb>,
    pub font_color: Option<Rgb>,
    pub bold: bool,
    pub centered: bool,
    pub border: bool,
}

impl CellStyle {
    pub fn to_format(&self) -> Format {
        let mut format = Format::new();

        if self.bold {
            format = format.set_bold();
        }
        if self.centered {
            format = format
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter);
        }
        if let Some(fill) = self.fill {
            format = format.set_background_color(Color::RGB(fill.to_u32()));
        }
        if let Some(font) = self.font_color {
            format = format.set_font_color(Color::RGB(font.to_u32()));
        }
        if self.border {
            format = format.set_border(FormatBorder::Thin);
        }

        format
    }
}
