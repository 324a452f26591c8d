use crate::Pos;

/// 1-based line, 0-based byte column.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self { line: 1, column: 0 }
    }
}

#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

/// Converts byte offsets to positions, rescanning only the text between the previous
/// query and the current one. Lines are separated by `\n`.
#[derive(Debug, Clone)]
pub struct LocConverter<'s> {
    input: &'s str,
    pos: Pos,
    line: u32,
    column: u32,
}

impl<'s> LocConverter<'s> {
    pub fn new(input: &'s str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 0,
        }
    }

    pub fn get(&mut self, pos: Pos) -> SourcePosition {
        let bytes = self.input.as_bytes();
        let pos = pos.min(bytes.len() as Pos);
        if pos > self.pos {
            let scanned = &bytes[self.pos as usize..pos as usize];
            match memchr::memrchr(b'\n', scanned) {
                Some(last) => {
                    self.line += memchr::memchr_iter(b'\n', scanned).count() as u32;
                    self.column = (scanned.len() - last - 1) as u32;
                }
                None => self.column += scanned.len() as u32,
            }
        } else if pos < self.pos {
            let scanned = &bytes[pos as usize..self.pos as usize];
            self.line -= memchr::memchr_iter(b'\n', scanned).count() as u32;
            let line_start = memchr::memrchr(b'\n', &bytes[..pos as usize]).map_or(0, |i| i + 1);
            self.column = (pos as usize - line_start) as u32;
        }
        self.pos = pos;
        SourcePosition::new(self.line, self.column)
    }

    pub fn span(&mut self, start: Pos, end: Pos) -> SourceSpan {
        SourceSpan {
            start: self.get(start),
            end: self.get(end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward() {
        let mut loc = LocConverter::new("a {\n  color: red;\n}\n");
        assert_eq!(loc.get(0), SourcePosition::new(1, 0));
        assert_eq!(loc.get(2), SourcePosition::new(1, 2));
        assert_eq!(loc.get(6), SourcePosition::new(2, 2));
        assert_eq!(loc.get(18), SourcePosition::new(3, 0));
        assert_eq!(loc.get(20), SourcePosition::new(4, 0));
    }

    #[test]
    fn backward() {
        let mut loc = LocConverter::new("ab\ncd\nef");
        assert_eq!(loc.get(7), SourcePosition::new(3, 1));
        assert_eq!(loc.get(4), SourcePosition::new(2, 1));
        assert_eq!(loc.get(1), SourcePosition::new(1, 1));
        assert_eq!(loc.get(3), SourcePosition::new(2, 0));
    }

    #[test]
    fn out_of_bounds_is_clamped() {
        let mut loc = LocConverter::new("ab\n");
        assert_eq!(loc.get(100), SourcePosition::new(2, 0));
    }

    #[test]
    fn span() {
        let mut loc = LocConverter::new(".a {}\n.b {}");
        let span = loc.span(6, 11);
        assert_eq!(span.start, SourcePosition::new(2, 0));
        assert_eq!(span.end, SourcePosition::new(2, 5));
    }
}
