use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// An RGB color hint applied to in flight glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ColorError;

    /// Parse `#RRGGBB` or `#RGB`, the leading `#` being optional.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let hex = input.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHex(input.to_string()));
        }
        let parse = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| ColorError::InvalidHex(input.to_string()));
        match hex.len() {
            6 => Ok(Self::new(parse(&hex[0..2])?, parse(&hex[2..4])?, parse(&hex[4..6])?)),
            3 => {
                let expand = |digit: &str| parse(&digit.repeat(2));
                Ok(Self::new(expand(&hex[0..1])?, expand(&hex[1..2])?, expand(&hex[2..3])?))
            }
            _ => Err(ColorError::InvalidLength(input.to_string())),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        input.parse()
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid hex color '{0}'")]
    InvalidHex(String),

    #[error("hex color '{0}' must have 3 or 6 digits")]
    InvalidLength(String),
}

/// A single rendered unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// A character shown as is.
    Plain(char),

    /// An in flight glyph, styled so it can be told apart from settled text.
    Scrambled { glyph: char, color: Color },
}

impl Segment {
    pub fn glyph(&self) -> char {
        match self {
            Self::Plain(c) => *c,
            Self::Scrambled { glyph, .. } => *glyph,
        }
    }

    pub fn is_scrambled(&self) -> bool {
        matches!(self, Self::Scrambled { .. })
    }
}

/// The content rendered into a display element on one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    segments: Vec<Segment>,
}

impl Frame {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn plain(text: &str) -> Self {
        Self { segments: text.chars().map(Segment::Plain).collect() }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn plain_text(&self) -> String {
        self.segments.iter().map(Segment::glyph).collect()
    }

    pub fn scrambled_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_scrambled()).count()
    }

    /// Render as markup, wrapping in flight glyphs in styled inline units.
    pub fn to_markup(&self) -> String {
        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Plain(c) => push_escaped(&mut output, *c),
                Segment::Scrambled { glyph, color } => {
                    output.push_str(&format!("<span class=\"scramble-glyph\" style=\"color: {color}\">"));
                    push_escaped(&mut output, *glyph);
                    output.push_str("</span>");
                }
            }
        }
        output
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.plain_text())
    }
}

fn push_escaped(output: &mut String, c: char) {
    match c {
        '<' => output.push_str("&lt;"),
        '>' => output.push_str("&gt;"),
        '&' => output.push_str("&amp;"),
        '"' => output.push_str("&quot;"),
        _ => output.push(c),
    }
}

/// A text bearing display element an engine renders into.
pub trait Surface {
    /// The element's current plain text content.
    fn text(&self) -> String;

    /// Replace the element's content.
    fn render(&mut self, frame: &Frame);
}

/// An in memory display element.
#[derive(Debug, Clone, Default)]
pub struct TextElement {
    frame: Frame,
    renders: usize,
}

impl TextElement {
    pub fn new(text: &str) -> Self {
        Self { frame: Frame::plain(text), renders: 0 }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// How many times the element was rendered into.
    pub fn renders(&self) -> usize {
        self.renders
    }
}

impl Surface for TextElement {
    fn text(&self) -> String {
        self.frame.plain_text()
    }

    fn render(&mut self, frame: &Frame) {
        self.frame = frame.clone();
        self.renders += 1;
    }
}
