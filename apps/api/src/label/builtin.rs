//! Built-in fallback font: a fixed-size monospace bitmap face that needs no
//! font files. It cannot be resized and exposes no vertical metrics.

use embedded_graphics::{
    mono_font::{iso_8859_1::FONT_10X20, MonoTextStyle},
    pixelcolor::{Gray8, GrayColor},
    prelude::*,
    text::{Baseline, Text},
};
use image::{GrayImage, Luma};

use crate::label::fonts::{LabelFont, TextBox, VerticalMetrics};

pub struct BuiltinFont;

impl BuiltinFont {
    fn style() -> MonoTextStyle<'static, Gray8> {
        MonoTextStyle::new(&FONT_10X20, Gray8::BLACK)
    }
}

impl LabelFont for BuiltinFont {
    fn text_box(&self, text: &str) -> TextBox {
        if text.is_empty() {
            return TextBox::default();
        }
        let bounds =
            Text::with_baseline(text, Point::zero(), Self::style(), Baseline::Top).bounding_box();
        TextBox {
            left: bounds.top_left.x,
            top: bounds.top_left.y,
            right: bounds.top_left.x + bounds.size.width as i32,
            bottom: bounds.top_left.y + bounds.size.height as i32,
        }
    }

    fn vertical_metrics(&self) -> Option<VerticalMetrics> {
        None
    }

    fn draw(&self, canvas: &mut GrayImage, x: i32, y: i32, text: &str) {
        let mut target = GrayCanvas(canvas);
        let _ = Text::with_baseline(text, Point::new(x, y), Self::style(), Baseline::Top)
            .draw(&mut target);
    }
}

/// Adapts an `image` grayscale buffer to an embedded-graphics draw target.
struct GrayCanvas<'a>(&'a mut GrayImage);

impl DrawTarget for GrayCanvas<'_> {
    type Color = Gray8;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = self.0.dimensions();
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32, point.y as u32);
            if x < width && y < height {
                self.0.put_pixel(x, y, Luma([color.luma()]));
            }
        }
        Ok(())
    }
}

impl OriginDimensions for GrayCanvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}
