use crate::scramble::{Frame, Segment, Surface};
use crossterm::{
    ExecutableCommand, QueueableCommand,
    cursor::{Hide, MoveToColumn, Show},
    style::{self, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};
use tracing::warn;

/// A display element that is a single terminal line, repainted in place on every render.
pub struct TerminalLine<W: Write> {
    writer: W,
    frame: Frame,
    error: Option<io::Error>,
}

impl<W: Write> TerminalLine<W> {
    pub fn new(writer: W, text: &str) -> Self {
        Self { writer, frame: Frame::plain(text), error: None }
    }

    /// The first error hit while painting, if any.
    pub fn error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn paint(&mut self) -> io::Result<()> {
        self.writer.queue(MoveToColumn(0))?.queue(Clear(ClearType::CurrentLine))?;
        for segment in self.frame.segments() {
            match segment {
                Segment::Plain(c) => {
                    self.writer.queue(Print(*c))?;
                }
                Segment::Scrambled { glyph, color } => {
                    let color = style::Color::Rgb { r: color.r, g: color.g, b: color.b };
                    self.writer.queue(SetForegroundColor(color))?.queue(Print(*glyph))?.queue(ResetColor)?;
                }
            }
        }
        self.writer.flush()
    }
}

impl<W: Write> Surface for TerminalLine<W> {
    fn text(&self) -> String {
        self.frame.plain_text()
    }

    fn render(&mut self, frame: &Frame) {
        self.frame = frame.clone();
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.paint() {
            warn!("failed to paint frame: {e}");
            self.error = Some(e);
        }
    }
}

/// Keeps the cursor hidden for as long as it lives.
pub struct HiddenCursor<W: Write> {
    writer: W,
}

impl<W: Write> HiddenCursor<W> {
    pub fn hide(mut writer: W) -> io::Result<Self> {
        writer.execute(Hide)?;
        Ok(Self { writer })
    }
}

impl<W: Write> Drop for HiddenCursor<W> {
    fn drop(&mut self) {
        if let Err(e) = self.writer.execute(Show) {
            warn!("failed to show cursor: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scramble::Color;

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("broken"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("broken"))
        }
    }

    #[test]
    fn paints_segments() {
        let mut line = TerminalLine::new(Vec::new(), "ab");
        line.render(&Frame::new(vec![
            Segment::Plain('x'),
            Segment::Scrambled { glyph: '#', color: Color::new(255, 0, 0) },
        ]));
        assert_eq!(line.text(), "x#");
        assert!(line.error().is_none());

        let output = String::from_utf8(line.into_inner()).expect("not utf8");
        assert!(output.contains('x'));
        assert!(output.contains('#'));
        assert!(output.contains("38;2;255;0;0"));
    }

    #[test]
    fn keeps_first_error() {
        let mut line = TerminalLine::new(BrokenWriter, "ab");
        line.render(&Frame::plain("cd"));
        line.render(&Frame::plain("ef"));
        assert!(line.error().is_some());
        assert_eq!(line.text(), "ef");
    }

    #[test]
    fn cursor_is_shown_on_drop() {
        let mut output = Vec::new();
        {
            let _cursor = HiddenCursor::hide(&mut output).expect("failed to hide");
        }
        let output = String::from_utf8(output).expect("not utf8");
        let hidden = output.find("\x1b[?25l").expect("cursor never hidden");
        let shown = output.find("\x1b[?25h").expect("cursor never shown");
        assert!(hidden < shown);
    }

    #[test]
    fn cursor_is_shown_on_early_return() {
        fn fails(output: &mut Vec<u8>) -> io::Result<()> {
            let _cursor = HiddenCursor::hide(output)?;
            Err(io::Error::other("boom"))
        }
        let mut output = Vec::new();
        assert!(fails(&mut output).is_err());
        assert!(String::from_utf8(output).expect("not utf8").ends_with("\x1b[?25h"));
    }
}
