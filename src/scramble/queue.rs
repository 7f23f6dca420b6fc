use super::charset::Charset;
use super::mapping::MappingTable;
use super::random::RandomSource;

/// Portion of the total duration during which positions may start scrambling.
const START_WINDOW: f64 = 0.3;

/// Portion of the total duration a single position may keep scrambling for.
const SCRAMBLE_WINDOW: f64 = 0.7;

const NO_BREAK_SPACE: char = '\u{a0}';

/// The timing and charset for a single character position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealRecord {
    /// The character shown before this position starts scrambling, if any.
    pub from: Option<char>,

    /// The character this position settles on, if any.
    pub to: Option<char>,

    /// The first tick at which this position scrambles.
    pub start_tick: u32,

    /// The tick at which this position settles.
    pub end_tick: u32,

    /// The glyphs this position draws from while scrambling.
    pub charset: Charset,

    /// The glyph currently held while scrambling.
    pub chosen: Option<char>,
}

impl RevealRecord {
    fn passthrough(from: Option<char>, to: Option<char>) -> Self {
        Self { from, to, start_tick: 0, end_tick: 0, charset: Charset::default(), chosen: None }
    }

    pub fn is_settled(&self, tick: u32) -> bool {
        tick >= self.end_tick
    }

    pub fn is_scrambling(&self, tick: u32) -> bool {
        !self.is_settled(tick) && tick >= self.start_tick
    }
}

/// The inputs needed to build a reveal queue.
#[derive(Debug, Clone, Copy)]
pub struct QueueSpec<'a> {
    pub total_ticks: u32,
    pub preserve_whitespace: bool,
    pub mappings: &'a MappingTable,
    pub charset: &'a Charset,
}

/// Build one reveal record per position of the longer of `old_text` and `new_text`.
pub fn build_queue(
    old_text: &str,
    new_text: &str,
    spec: QueueSpec<'_>,
    random: &mut dyn RandomSource,
) -> Vec<RevealRecord> {
    let old: Vec<char> = old_text.chars().collect();
    let new: Vec<char> = new_text.chars().collect();
    let length = old.len().max(new.len());
    let total = f64::from(spec.total_ticks);

    let mut queue = Vec::with_capacity(length);
    for index in 0..length {
        let from = old.get(index).copied();
        let to = new.get(index).copied();
        if spec.preserve_whitespace && to.is_some_and(is_preserved_whitespace) {
            queue.push(RevealRecord::passthrough(from, to));
            continue;
        }
        let start_tick = (random.next_unit() * total * START_WINDOW).floor() as u32;
        let end_tick = start_tick + (random.next_unit() * total * SCRAMBLE_WINDOW).floor() as u32;
        let charset = match to {
            Some(target) => spec.mappings.charset_for(target, spec.charset),
            None => spec.charset,
        };
        queue.push(RevealRecord { from, to, start_tick, end_tick, charset: charset.clone(), chosen: None });
    }
    queue
}

fn is_preserved_whitespace(c: char) -> bool {
    c == ' ' || c == NO_BREAK_SPACE
}
