// ABOUTME: Outline parsing module for the outline-deck application
// ABOUTME: Turns pasted free-form outline text into ordered slide records

use log::debug;

/// Marker that opens a new slide record.
pub const TITLE_MARKER: &str = "TITRE:";
/// Marker announcing the bullet list; carries no data.
pub const POINTS_MARKER: &str = "POINTS:";
/// Marker holding the visual: an image URL or a generation prompt depending on the mode.
pub const VISUAL_MARKER: &str = "VISUEL:";

/// One slide of the outline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideRecord {
    pub title: String,
    pub bullets: Vec<String>,
    pub visual: String,
}

impl SlideRecord {
    /// Create a record with a title and no bullets or visual.
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }
}

/// Parse outline text into slide records, in outline order.
///
/// Recognized lines (markers are case-insensitive prefixes, surrounding
/// whitespace is ignored):
/// - `TITRE: <title>` closes the record in progress and opens a new one
/// - `POINTS:` is accepted and discarded
/// - `- <text>` or `• <text>` appends a bullet to the record in progress
/// - `VISUEL: <text>` sets the visual of the record in progress (last one wins)
///
/// Everything else, including bullets and visuals seen before the first
/// title, is dropped without error.
pub fn parse_outline(raw_text: &str) -> Vec<SlideRecord> {
    let mut records = Vec::new();
    let mut current: Option<SlideRecord> = None;

    for line in raw_text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(title) = strip_marker(line, TITLE_MARKER) {
            if let Some(done) = current.take() {
                records.push(done);
            }
            current = Some(SlideRecord::new(title));
        } else if strip_marker(line, POINTS_MARKER).is_some() {
            continue;
        } else if line.starts_with('-') || line.starts_with('•') {
            match current.as_mut() {
                Some(record) => record.bullets.push(bullet_text(line).to_string()),
                None => debug!("Dropping bullet outside of a slide: {:?}", line),
            }
        } else if let Some(visual) = strip_marker(line, VISUAL_MARKER) {
            match current.as_mut() {
                Some(record) => record.visual = visual.to_string(),
                None => debug!("Dropping visual outside of a slide: {:?}", line),
            }
        } else {
            debug!("Ignoring unrecognized outline line: {:?}", line);
        }
    }

    if let Some(done) = current {
        records.push(done);
    }

    records
}

/// Return the trimmed remainder of `line` if it starts with `marker`, ignoring ASCII case.
fn strip_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let head = line.get(..marker.len())?;
    if head.eq_ignore_ascii_case(marker) {
        Some(line[marker.len()..].trim())
    } else {
        None
    }
}

/// Strip every leading dash, bullet glyph and space from a bullet line.
fn bullet_text(line: &str) -> &str {
    line.trim_start_matches(|c| c == '-' || c == '•' || c == ' ')
        .trim()
}
