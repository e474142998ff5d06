// SPDX-License-Identifier: MIT
//
// Style: text attributes and the 8-color palette as one bitmask.
//
// The low byte holds attributes, the next two bytes one-hot foreground and
// background colors. Every bit maps to exactly one SGR code, which keeps
// style transitions a matter of set arithmetic: bits to add are emitted,
// and dropping any bit forces a reset first (SGR has no portable per-bit
// "off" codes for all attributes).

bitflags::bitflags! {
    /// Text attributes and 8-color foreground/background.
    ///
    /// ```
    /// use fg_term::style::{Color, Style};
    ///
    /// let s = Style::BOLD | Style::fg(Color::Red);
    /// assert!(s.contains(Style::FG_RED));
    /// assert_eq!(s.sgr_codes(), vec![1, 31]);
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Style: u32 {
        const BOLD      = 1 << 0;
        const DIM       = 1 << 1;
        const ITALIC    = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK     = 1 << 4;
        const INVERSE   = 1 << 5;

        const FG_BLACK   = 1 << 8;
        const FG_RED     = 1 << 9;
        const FG_GREEN   = 1 << 10;
        const FG_YELLOW  = 1 << 11;
        const FG_BLUE    = 1 << 12;
        const FG_MAGENTA = 1 << 13;
        const FG_CYAN    = 1 << 14;
        const FG_WHITE   = 1 << 15;

        const BG_BLACK   = 1 << 16;
        const BG_RED     = 1 << 17;
        const BG_GREEN   = 1 << 18;
        const BG_YELLOW  = 1 << 19;
        const BG_BLUE    = 1 << 20;
        const BG_MAGENTA = 1 << 21;
        const BG_CYAN    = 1 << 22;
        const BG_WHITE   = 1 << 23;
    }
}

/// Bit → SGR code, in emission order.
const STYLE_CODES: [(Style, u8); 22] = [
    (Style::BOLD, 1),
    (Style::DIM, 2),
    (Style::ITALIC, 3),
    (Style::UNDERLINE, 4),
    (Style::BLINK, 5),
    (Style::INVERSE, 7),
    (Style::FG_BLACK, 30),
    (Style::FG_RED, 31),
    (Style::FG_GREEN, 32),
    (Style::FG_YELLOW, 33),
    (Style::FG_BLUE, 34),
    (Style::FG_MAGENTA, 35),
    (Style::FG_CYAN, 36),
    (Style::FG_WHITE, 37),
    (Style::BG_BLACK, 40),
    (Style::BG_RED, 41),
    (Style::BG_GREEN, 42),
    (Style::BG_YELLOW, 43),
    (Style::BG_BLUE, 44),
    (Style::BG_MAGENTA, 45),
    (Style::BG_CYAN, 46),
    (Style::BG_WHITE, 47),
];

/// The eight basic ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
}

impl Style {
    /// No attributes, default colors.
    pub const RESET: Self = Self::empty();

    /// All foreground color bits.
    pub const FG_MASK: Self = Self::from_bits_truncate(0x0000_ff00);

    /// All background color bits.
    pub const BG_MASK: Self = Self::from_bits_truncate(0x00ff_0000);

    /// Foreground color bit for `color`.
    #[must_use]
    pub const fn fg(color: Color) -> Self {
        Self::from_bits_truncate(1 << (8 + color as u32))
    }

    /// Background color bit for `color`.
    #[must_use]
    pub const fn bg(color: Color) -> Self {
        Self::from_bits_truncate(1 << (16 + color as u32))
    }

    /// This style with its foreground replaced by `color`.
    #[must_use]
    pub const fn with_fg(self, color: Color) -> Self {
        self.difference(Self::FG_MASK).union(Self::fg(color))
    }

    /// This style with its background replaced by `color`.
    #[must_use]
    pub const fn with_bg(self, color: Color) -> Self {
        self.difference(Self::BG_MASK).union(Self::bg(color))
    }

    /// SGR codes for every set bit, in table order.
    #[must_use]
    pub fn sgr_codes(self) -> Vec<u8> {
        STYLE_CODES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|&(_, code)| code)
            .collect()
    }
}
