/// Cursor over the flat display text
///
/// Rows are lines of the layout; columns and offsets count chars, matching
/// [`crate::TextLayout`] flat offsets.
#[derive(Debug, Clone)]
pub struct CursorState {
    pub row: usize,
    pub col: usize,
    /// Flat offset of the first char of each line
    line_starts: Vec<usize>,
    lines: Vec<Vec<char>>,
}

impl CursorState {
    pub fn new() -> Self {
        Self {
            row: 0,
            col: 0,
            line_starts: vec![0],
            lines: Vec::new(),
        }
    }

    /// Load flat text; the cursor is kept in place when it still fits
    pub fn set_content(&mut self, content: &str) {
        let body = content.strip_suffix('\n').unwrap_or(content);
        self.lines = body.split('\n').map(|l| l.chars().collect()).collect();
        self.line_starts.clear();
        let mut start = 0;
        for line in &self.lines {
            self.line_starts.push(start);
            start += line.len() + 1;
        }
        self.clamp();
    }

    fn clamp(&mut self) {
        self.row = self.row.min(self.lines.len().saturating_sub(1));
        self.col = self.col.min(self.line_len(self.row));
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map(Vec::len).unwrap_or(0)
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Flat offset of the cursor
    pub fn offset(&self) -> usize {
        self.cursor_to_offset(self.row, self.col)
    }

    pub fn cursor_to_offset(&self, row: usize, col: usize) -> usize {
        match self.line_starts.get(row) {
            Some(start) => start + col.min(self.line_len(row)),
            None => {
                let last = self.lines.len().saturating_sub(1);
                self.line_starts.get(last).copied().unwrap_or(0) + self.line_len(last)
            }
        }
    }

    pub fn offset_to_cursor(&self, offset: usize) -> (usize, usize) {
        for (row, &start) in self.line_starts.iter().enumerate().rev() {
            if offset >= start {
                return (row, (offset - start).min(self.line_len(row)));
            }
        }
        (0, 0)
    }

    pub fn set_cursor_offset(&mut self, offset: usize) {
        let (row, col) = self.offset_to_cursor(offset);
        self.row = row;
        self.col = col;
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<String> {
        self.lines.get(index).map(|l| l.iter().collect())
    }

    pub fn move_up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.line_len(self.row);
        }
    }

    pub fn move_right(&mut self) {
        if self.col < self.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn move_to_start(&mut self) {
        self.col = 0;
    }

    pub fn move_to_end(&mut self) {
        self.col = self.line_len(self.row);
    }

    pub fn move_to_top(&mut self) {
        self.row = 0;
        self.col = 0;
    }

    pub fn move_to_bottom(&mut self) {
        if !self.lines.is_empty() {
            self.row = self.lines.len() - 1;
            self.col = 0;
        }
    }

    pub fn move_word_forward(&mut self) {
        let Some(chars) = self.lines.get(self.row) else {
            return;
        };
        let mut col = self.col;
        while col < chars.len() && !chars[col].is_whitespace() {
            col += 1;
        }
        while col < chars.len() && chars[col].is_whitespace() {
            col += 1;
        }

        if col >= chars.len() && self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        } else {
            self.col = col;
        }
    }

    pub fn move_word_back(&mut self) {
        if self.col == 0 {
            if self.row > 0 {
                self.row -= 1;
                self.col = self.line_len(self.row);
            }
            return;
        }

        let Some(chars) = self.lines.get(self.row) else {
            return;
        };
        let mut col = self.col.min(chars.len());
        while col > 0 && chars[col - 1].is_whitespace() {
            col -= 1;
        }
        while col > 0 && !chars[col - 1].is_whitespace() {
            col -= 1;
        }
        self.col = col;
    }
}

impl Default for CursorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_movement() {
        let mut cursor = CursorState::new();
        cursor.set_content("Hello\nWorld\nTest\n");
        assert_eq!(cursor.line_count(), 3);

        cursor.move_down();
        cursor.move_right();
        cursor.move_right();
        assert_eq!(cursor.cursor(), (1, 2));

        cursor.move_up();
        assert_eq!(cursor.cursor(), (0, 2));

        cursor.move_to_end();
        cursor.move_right();
        assert_eq!(cursor.cursor(), (1, 0));
    }

    #[test]
    fn test_offsets_count_chars() {
        let mut cursor = CursorState::new();
        cursor.set_content("Héllo\nWörld");

        assert_eq!(cursor.cursor_to_offset(0, 5), 5);
        assert_eq!(cursor.cursor_to_offset(1, 0), 6);
        assert_eq!(cursor.cursor_to_offset(1, 5), 11);
        assert_eq!(cursor.offset_to_cursor(8), (1, 2));

        cursor.set_cursor_offset(7);
        assert_eq!(cursor.cursor(), (1, 1));
        assert_eq!(cursor.offset(), 7);
    }

    #[test]
    fn test_word_motions() {
        let mut cursor = CursorState::new();
        cursor.set_content("one two  three\nfour");
        cursor.move_word_forward();
        assert_eq!(cursor.col, 4);
        cursor.move_word_forward();
        assert_eq!(cursor.col, 9);
        cursor.move_word_forward();
        assert_eq!(cursor.cursor(), (1, 0));
        cursor.move_word_back();
        assert_eq!(cursor.cursor(), (0, 14));
        cursor.move_word_back();
        assert_eq!(cursor.col, 9);
    }

    #[test]
    fn test_reload_keeps_cursor_in_bounds() {
        let mut cursor = CursorState::new();
        cursor.set_content("a long first line\nsecond");
        cursor.move_down();
        cursor.move_to_end();
        cursor.set_content("short");
        assert_eq!(cursor.cursor(), (0, 5));
    }
}
