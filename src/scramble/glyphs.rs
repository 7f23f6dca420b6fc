/// The built in "glitch" palette used when nothing else resolves.
///
/// 26 glyphs, 7 of which are the `_` filler so roughly one draw in four lands on it.
pub(crate) const DEFAULT_GLYPHS: &[char] = &[
    '!', '<', '>', '-', '\\', '/', '[', ']', '{', '}', '—', '=', '+', '*', '^', '?', '#', '%', '&',
    // Filler
    '_', '_', '_', '_', '_', '_', '_',
];
