use ratatui::style::Color;

/// Colours for one appearance mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub selection: Color,
    pub highlight: Color,
    pub current_match: Color,
    pub pin: Color,
    pub danger: Color,
}

impl Palette {
    pub const DARK: Palette = Palette {
        background: Color::Rgb(24, 24, 27),
        text: Color::Rgb(228, 228, 231),
        muted: Color::Rgb(113, 113, 122),
        accent: Color::Cyan,
        selection: Color::Blue,
        highlight: Color::Yellow,
        current_match: Color::Rgb(249, 115, 22),
        pin: Color::Yellow,
        danger: Color::Red,
    };

    pub const LIGHT: Palette = Palette {
        background: Color::Rgb(250, 250, 249),
        text: Color::Rgb(41, 37, 36),
        muted: Color::Rgb(120, 113, 108),
        accent: Color::Rgb(13, 148, 136),
        selection: Color::Rgb(191, 219, 254),
        highlight: Color::Rgb(253, 224, 71),
        current_match: Color::Rgb(251, 146, 60),
        pin: Color::Rgb(202, 138, 4),
        danger: Color::Rgb(220, 38, 38),
    };

    pub fn for_mode(dark_mode: bool) -> Self {
        if dark_mode {
            Self::DARK
        } else {
            Self::LIGHT
        }
    }
}
