// SPDX-License-Identifier: MIT
//
// Canvas: the off-screen character grid applications draw into.
//
// Layout:
//
//   - Flat `Vec<char>` with row-major indexing. A row's cells are
//     contiguous, so drawing a row is a linear scan.
//
//   - Optionally a parallel `Vec<Style>` of the same length. A canvas
//     created with `Canvas::styled` carries it; a plain canvas does not
//     and renders without any SGR output.
//
//   - One `char` per cell. Every row has exactly `width` cells at all
//     times; changing the size means building a new canvas.
//
// Coordinate contract: apart from `write_at`, which wraps and clips text
// on purpose, every operation asserts its coordinates are in bounds and
// panics otherwise. An out-of-range write is a bug in the caller.

use std::io::{self, Write};

use crate::output::Output;
use crate::style::Style;

/// Character used by `new` and `clear`.
pub const DEFAULT_CHAR: char = ' ';

/// A `width`×`height` grid of characters, optionally with per-cell styles.
///
/// ```
/// use fg_term::canvas::Canvas;
///
/// let mut canvas = Canvas::new(10, 2);
/// canvas.write_at(0, 0, "hello");
/// assert_eq!(canvas.get_line(0), "hello     ");
/// assert_eq!(canvas.get_at(1, 0), 'e');
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u16,
    height: u16,
    cells: Vec<char>,
    styles: Option<Vec<Style>>,
}

impl Canvas {
    // ─── Construction ────────────────────────────────────────────────────

    /// Plain canvas filled with spaces.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self::filled(width, height, DEFAULT_CHAR)
    }

    /// Plain canvas filled with `ch`.
    #[must_use]
    pub fn filled(width: u16, height: u16, ch: char) -> Self {
        Self {
            width,
            height,
            cells: vec![ch; area(width, height)],
            styles: None,
        }
    }

    /// Styled canvas filled with spaces in `Style::RESET`.
    #[must_use]
    pub fn styled(width: u16, height: u16) -> Self {
        Self::styled_with(width, height, DEFAULT_CHAR, Style::RESET)
    }

    /// Styled canvas filled with `ch` in `style`.
    #[must_use]
    pub fn styled_with(width: u16, height: u16, ch: char, style: Style) -> Self {
        Self {
            width,
            height,
            cells: vec![ch; area(width, height)],
            styles: Some(vec![style; area(width, height)]),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Whether this canvas carries per-cell styles.
    #[inline]
    #[must_use]
    pub const fn is_styled(&self) -> bool {
        self.styles.is_some()
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn check_cell(&self, x: u16, y: u16) {
        assert!(
            x < self.width && y < self.height,
            "cell ({x}, {y}) outside {}x{} canvas",
            self.width,
            self.height
        );
    }

    /// Bounds check for a run of `len` cells starting at `(x, y)`.
    fn check_run(&self, x: u16, y: u16, len: usize) {
        self.check_cell(x, y);
        assert!(
            len <= usize::from(self.width - x),
            "run of {len} cells at ({x}, {y}) overflows {}-wide canvas",
            self.width
        );
    }

    fn styles_mut(&mut self) -> &mut Vec<Style> {
        self.styles
            .as_mut()
            .unwrap_or_else(|| panic!("style write on a plain canvas"))
    }

    // ─── Characters ──────────────────────────────────────────────────────

    #[must_use]
    pub fn get_at(&self, x: u16, y: u16) -> char {
        self.check_cell(x, y);
        self.cells[self.index(x, y)]
    }

    pub fn set_at(&mut self, x: u16, y: u16, ch: char) {
        self.check_cell(x, y);
        let i = self.index(x, y);
        self.cells[i] = ch;
    }

    /// Row `y` as a slice.
    #[must_use]
    pub fn row(&self, y: u16) -> &[char] {
        assert!(y < self.height, "row {y} outside {}-high canvas", self.height);
        let start = self.index(0, y);
        &self.cells[start..start + usize::from(self.width)]
    }

    #[must_use]
    pub fn get_line(&self, y: u16) -> String {
        self.row(y).iter().collect()
    }

    /// Replace row `y`. `line` must be exactly `width` characters.
    pub fn set_line(&mut self, y: u16, line: &str) {
        assert!(y < self.height, "row {y} outside {}-high canvas", self.height);
        let start = self.index(0, y);
        let row = &mut self.cells[start..start + usize::from(self.width)];
        let mut chars = line.chars();
        for cell in row.iter_mut() {
            *cell = chars
                .next()
                .unwrap_or_else(|| panic!("line shorter than canvas width {}", self.width));
        }
        assert!(chars.next().is_none(), "line longer than canvas width");
    }

    /// `w` characters of row `y` starting at `x`. A zero-width part is
    /// empty without any bounds check.
    #[must_use]
    pub fn get_line_part(&self, y: u16, x: u16, w: u16) -> String {
        if w == 0 {
            return String::new();
        }
        self.check_run(x, y, usize::from(w));
        let start = self.index(x, y);
        self.cells[start..start + usize::from(w)].iter().collect()
    }

    /// Overwrite row `y` from `x` with `part`. An empty part is a no-op.
    pub fn set_line_part(&mut self, y: u16, x: u16, part: &str) {
        let chars: Vec<char> = part.chars().collect();
        self.put_chars(x, y, &chars);
    }

    fn put_chars(&mut self, x: u16, y: u16, chars: &[char]) {
        if chars.is_empty() {
            return;
        }
        self.check_run(x, y, chars.len());
        let start = self.index(x, y);
        self.cells[start..start + chars.len()].copy_from_slice(chars);
    }

    /// Lay out `text` starting at `(x, y)`.
    ///
    /// Lines break at `\n` and wrap at the right edge, continuing at column
    /// 0 of the next row. Text past the last row is dropped. Styles are
    /// left untouched.
    pub fn write_at(&mut self, x: u16, y: u16, text: &str) {
        for (rx, ry, run) in text_runs(self.width, self.height, x, y, text) {
            self.put_chars(rx, ry, &run);
        }
    }

    /// [`write_at`](Self::write_at), also setting the style of every
    /// written cell.
    pub fn write_styled_at(&mut self, x: u16, y: u16, text: &str, style: Style) {
        for (rx, ry, run) in text_runs(self.width, self.height, x, y, text) {
            self.put_chars(rx, ry, &run);
            if !run.is_empty() {
                let start = self.index(rx, ry);
                self.styles_mut()[start..start + run.len()].fill(style);
            }
        }
    }

    /// Set every cell to `ch`.
    pub fn fill(&mut self, ch: char) {
        self.cells.fill(ch);
    }

    /// Reset every cell to a space, and every style to `Style::RESET`.
    pub fn clear(&mut self) {
        self.fill(DEFAULT_CHAR);
        if let Some(styles) = &mut self.styles {
            styles.fill(Style::RESET);
        }
    }

    // ─── Styles ──────────────────────────────────────────────────────────
    //
    // Getters on a plain canvas report `Style::RESET`; setters panic.

    #[must_use]
    pub fn get_style_at(&self, x: u16, y: u16) -> Style {
        self.check_cell(x, y);
        self.styles
            .as_ref()
            .map_or(Style::RESET, |s| s[self.index(x, y)])
    }

    pub fn set_style_at(&mut self, x: u16, y: u16, style: Style) {
        self.check_cell(x, y);
        let i = self.index(x, y);
        self.styles_mut()[i] = style;
    }

    #[must_use]
    pub fn get_style_line(&self, y: u16) -> Vec<Style> {
        assert!(y < self.height, "row {y} outside {}-high canvas", self.height);
        let w = usize::from(self.width);
        self.styles.as_ref().map_or_else(
            || vec![Style::RESET; w],
            |s| {
                let start = self.index(0, y);
                s[start..start + w].to_vec()
            },
        )
    }

    /// Replace the styles of row `y`. `styles` must be exactly `width` long.
    pub fn set_style_line(&mut self, y: u16, styles: &[Style]) {
        assert!(y < self.height, "row {y} outside {}-high canvas", self.height);
        assert_eq!(styles.len(), usize::from(self.width), "style line length");
        let start = self.index(0, y);
        self.styles_mut()[start..start + styles.len()].copy_from_slice(styles);
    }

    #[must_use]
    pub fn get_style_line_part(&self, y: u16, x: u16, w: u16) -> Vec<Style> {
        if w == 0 {
            return Vec::new();
        }
        self.check_run(x, y, usize::from(w));
        let start = self.index(x, y);
        self.styles.as_ref().map_or_else(
            || vec![Style::RESET; usize::from(w)],
            |s| s[start..start + usize::from(w)].to_vec(),
        )
    }

    pub fn set_style_line_part(&mut self, y: u16, x: u16, part: &[Style]) {
        if part.is_empty() {
            return;
        }
        self.check_run(x, y, part.len());
        let start = self.index(x, y);
        self.styles_mut()[start..start + part.len()].copy_from_slice(part);
    }

    pub fn fill_style(&mut self, style: Style) {
        self.styles_mut().fill(style);
    }

    pub fn clear_style(&mut self) {
        self.fill_style(Style::RESET);
    }

    // ─── Regions ─────────────────────────────────────────────────────────

    /// Independent copy of the `w`×`h` region at `(x, y)`, of the same
    /// kind (plain or styled) as this canvas.
    #[must_use]
    pub fn sub(&self, x: u16, y: u16, w: u16, h: u16) -> Self {
        self.check_cell(x, y);
        assert!(w <= self.width - x, "sub width {w} overflows at x={x}");
        assert!(h <= self.height - y, "sub height {h} overflows at y={y}");

        if x == 0 && y == 0 && w == self.width && h == self.height {
            return self.clone();
        }

        let mut new = if self.is_styled() {
            Self::styled(w, h)
        } else {
            Self::new(w, h)
        };
        let n = usize::from(w);
        for row in 0..h {
            let src = self.index(x, y + row);
            let dst = new.index(0, row);
            new.cells[dst..dst + n].copy_from_slice(&self.cells[src..src + n]);
            if let (Some(from), Some(to)) = (&self.styles, &mut new.styles) {
                to[dst..dst + n].copy_from_slice(&from[src..src + n]);
            }
        }
        new
    }

    /// Copy all of `src` into this canvas with its top-left at `(x, y)`.
    ///
    /// `src` must fit entirely. A styled target takes `src`'s styles, or
    /// `Style::RESET` when `src` is plain.
    pub fn blit(&mut self, src: &Self, x: u16, y: u16) {
        self.check_cell(x, y);
        assert!(
            src.width <= self.width - x,
            "blit width {} overflows at x={x}",
            src.width
        );
        assert!(
            src.height <= self.height - y,
            "blit height {} overflows at y={y}",
            src.height
        );

        let w = usize::from(src.width);
        for row in 0..src.height {
            let from = src.index(0, row);
            let to = self.index(x, y + row);
            self.cells[to..to + w].copy_from_slice(&src.cells[from..from + w]);
            if let Some(styles) = &mut self.styles {
                match &src.styles {
                    Some(src_styles) => {
                        styles[to..to + w].copy_from_slice(&src_styles[from..from + w]);
                    }
                    None => styles[to..to + w].fill(Style::RESET),
                }
            }
        }
    }

    /// Fill the `w`×`h` rectangle at `(x, y)` with `ch`. On a styled
    /// canvas the rectangle's styles become `Style::RESET`.
    pub fn rect(&mut self, x: u16, y: u16, w: u16, h: u16, ch: char) {
        self.blit(&Self::filled(w, h, ch), x, y);
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Render the whole canvas from the current cursor position and flush.
    ///
    /// Plain canvases trim trailing spaces from each row and clear to the
    /// end of the line instead. Styled canvases set the style before every
    /// cell and reset once at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing to the terminal fails.
    pub fn draw<W: Write>(&self, out: &mut Output<W>) -> io::Result<()> {
        let mut line = String::with_capacity(usize::from(self.width));
        for y in 0..self.height {
            let row = self.row(y);
            match &self.styles {
                None => {
                    let end = row.iter().rposition(|&c| c != ' ').map_or(0, |i| i + 1);
                    line.clear();
                    line.extend(&row[..end]);
                    out.write(&line);
                    if end != row.len() {
                        out.clear_to_end_of_line();
                    }
                }
                Some(styles) => {
                    let start = self.index(0, y);
                    let row_styles = &styles[start..start + row.len()];
                    for (&ch, &style) in row.iter().zip(row_styles) {
                        out.set_style(style);
                        out.write_char(ch);
                    }
                }
            }
            out.write_line("");
        }
        if self.is_styled() {
            out.reset();
        }
        out.flush()
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_styled() { "styled" } else { "plain" };
        write!(f, "Canvas({}x{}, {kind})", self.width, self.height)
    }
}

const fn area(width: u16, height: u16) -> usize {
    width as usize * height as usize
}

/// Split `text` into the row runs `write_at` places, as `(x, y, chars)`.
fn text_runs(width: u16, height: u16, x: u16, y: u16, text: &str) -> Vec<(u16, u16, Vec<char>)> {
    assert!(
        x < width && y < height,
        "text origin ({x}, {y}) outside {width}x{height} canvas"
    );

    let mut runs = Vec::new();
    let (mut x, mut y) = (x, y);
    for line in text.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        let mut rest = chars.as_slice();
        loop {
            let n = usize::from(width - x).min(rest.len());
            runs.push((x, y, rest[..n].to_vec()));
            rest = &rest[n..];
            y += 1;
            if y >= height {
                return runs;
            }
            x = 0;
            if rest.is_empty() {
                break;
            }
        }
    }
    runs
}

// ─── Tests ───────────────────────────────────────────────────────────────────
