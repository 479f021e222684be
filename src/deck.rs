// ABOUTME: In-memory presentation model for the outline-deck application
// ABOUTME: Holds slides, text boxes and pictures until the deck is serialized

use crate::errors::Result;
use crate::images::ImagePayload;
use crate::pptx;

pub const EMU_PER_INCH: i64 = 914_400;

/// Slide width of a 4:3 deck.
pub const SLIDE_WIDTH: i64 = 10 * EMU_PER_INCH;
/// Slide height of a 4:3 deck.
pub const SLIDE_HEIGHT: i64 = 7 * EMU_PER_INCH + EMU_PER_INCH / 2;

/// Convert inches to English Metric Units.
pub fn inches(value: f64) -> i64 {
    (value * EMU_PER_INCH as f64).round() as i64
}

/// Position and size of a shape, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Rect {
    pub fn from_inches(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: inches(x),
            y: inches(y),
            cx: inches(width),
            cy: inches(height),
        }
    }

    pub fn right(&self) -> i64 {
        self.x + self.cx
    }
}

/// Run formatting shared by every character of a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub typeface: String,
    pub size_pt: u32,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,
    pub font: Font,
    pub space_after_pt: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBox {
    pub name: String,
    pub frame: Rect,
    pub word_wrap: bool,
    pub paragraphs: Vec<Paragraph>,
}

impl TextBox {
    /// Paragraph texts joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub name: String,
    pub frame: Rect,
    pub image: ImagePayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    TextBox(TextBox),
    Picture(Picture),
}

/// One slide: shapes in z-order, back to front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slide {
    shapes: Vec<Shape>,
}

impl Slide {
    pub fn add_text_box(&mut self, text_box: TextBox) -> &mut Self {
        self.shapes.push(Shape::TextBox(text_box));
        self
    }

    pub fn add_picture(&mut self, picture: Picture) -> &mut Self {
        self.shapes.push(Shape::Picture(picture));
        self
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn text_boxes(&self) -> impl Iterator<Item = &TextBox> {
        self.shapes.iter().filter_map(|shape| match shape {
            Shape::TextBox(text_box) => Some(text_box),
            Shape::Picture(_) => None,
        })
    }

    pub fn pictures(&self) -> impl Iterator<Item = &Picture> {
        self.shapes.iter().filter_map(|shape| match shape {
            Shape::Picture(picture) => Some(picture),
            Shape::TextBox(_) => None,
        })
    }

    /// Find a text box by name.
    pub fn text_box(&self, name: &str) -> Option<&TextBox> {
        self.text_boxes().find(|text_box| text_box.name == name)
    }
}

/// A presentation being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    title: String,
    slides: Vec<Slide>,
}

impl Deck {
    /// Start an empty deck; `title` goes into the document properties.
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            slides: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Append a blank slide and return it for filling.
    pub fn add_slide(&mut self) -> &mut Slide {
        self.slides.push(Slide::default());
        let last = self.slides.len() - 1;
        &mut self.slides[last]
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Serialize the deck into PPTX bytes.
    pub fn to_pptx(&self) -> Result<Vec<u8>> {
        pptx::write_pptx(self)
    }
}
