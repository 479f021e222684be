// ABOUTME: Slide layout module for the outline-deck application
// ABOUTME: Places titles, bullet text and pictures at fixed positions on blank slides

use crate::deck::{Deck, Font, Paragraph, Picture, Rect, TextBox, inches};
use crate::images::ImagePayload;

pub const FONT_FACE: &str = "Arial";
pub const BULLET_GLYPH: &str = "•";
/// Proofing language tagged on every text run.
pub const TEXT_LANG: &str = "en-US";

pub const TITLE_SIZE_PT: u32 = 32;
pub const BULLET_SIZE_PT: u32 = 16;
pub const BULLET_SPACE_AFTER_PT: u32 = 14;
pub const DECK_TITLE_SIZE_PT: u32 = 44;
pub const DECK_SUBTITLE_SIZE_PT: u32 = 24;

/// Shape names, used to find shapes again when inspecting a deck.
pub const TITLE_BOX: &str = "Title";
pub const BODY_BOX: &str = "Body";
pub const SUBTITLE_BOX: &str = "Subtitle";
pub const PICTURE_NAME: &str = "Picture";

const PICTURE_LEFT_IN: f64 = 5.8;
const PICTURE_TOP_IN: f64 = 1.8;
const PICTURE_WIDTH_IN: f64 = 3.8;

pub fn title_frame() -> Rect {
    Rect::from_inches(0.5, 0.4, 9.0, 1.0)
}

/// Frame of the bullet text: a narrow left column when a picture sits on the
/// right, the full content width otherwise.
pub fn body_frame(has_image: bool) -> Rect {
    if has_image {
        Rect::from_inches(0.5, 1.5, 5.0, 5.0)
    } else {
        Rect::from_inches(0.5, 1.5, 9.0, 5.0)
    }
}

/// Frame of a picture: fixed width right of the text column, height
/// following the image's aspect ratio.
pub fn picture_frame(image: &ImagePayload) -> Rect {
    let (width, height) = image.dimensions();
    let cx = inches(PICTURE_WIDTH_IN);
    let cy = (cx as f64 * height as f64 / width as f64).round() as i64;
    Rect {
        x: inches(PICTURE_LEFT_IN),
        y: inches(PICTURE_TOP_IN),
        cx,
        cy,
    }
}

fn font(size_pt: u32, bold: bool) -> Font {
    Font {
        typeface: FONT_FACE.to_string(),
        size_pt,
        bold,
    }
}

/// Add the opening slide with the deck title and a subtitle.
pub fn add_title_slide(deck: &mut Deck, title: &str, subtitle: &str) {
    let slide = deck.add_slide();
    slide
        .add_text_box(TextBox {
            name: TITLE_BOX.to_string(),
            frame: Rect::from_inches(0.75, 2.33, 8.5, 1.5),
            word_wrap: true,
            paragraphs: vec![Paragraph {
                text: title.to_string(),
                font: font(DECK_TITLE_SIZE_PT, true),
                space_after_pt: None,
            }],
        })
        .add_text_box(TextBox {
            name: SUBTITLE_BOX.to_string(),
            frame: Rect::from_inches(1.5, 4.0, 7.0, 1.5),
            word_wrap: true,
            paragraphs: vec![Paragraph {
                text: subtitle.to_string(),
                font: font(DECK_SUBTITLE_SIZE_PT, false),
                space_after_pt: None,
            }],
        });
}

/// Add one content slide: title, one bullet paragraph per entry, and the
/// picture on the right when there is one.
pub fn add_content_slide(
    deck: &mut Deck,
    title: &str,
    bullets: &[String],
    image: Option<ImagePayload>,
) {
    let slide = deck.add_slide();

    slide.add_text_box(TextBox {
        name: TITLE_BOX.to_string(),
        frame: title_frame(),
        word_wrap: true,
        paragraphs: vec![Paragraph {
            text: title.to_string(),
            font: font(TITLE_SIZE_PT, true),
            space_after_pt: None,
        }],
    });

    let paragraphs = bullets
        .iter()
        .map(|bullet| Paragraph {
            text: format!("{} {}", BULLET_GLYPH, bullet),
            font: font(BULLET_SIZE_PT, false),
            space_after_pt: Some(BULLET_SPACE_AFTER_PT),
        })
        .collect();
    slide.add_text_box(TextBox {
        name: BODY_BOX.to_string(),
        frame: body_frame(image.is_some()),
        word_wrap: true,
        paragraphs,
    });

    if let Some(image) = image {
        slide.add_picture(Picture {
            name: PICTURE_NAME.to_string(),
            frame: picture_frame(&image),
            image,
        });
    }
}
