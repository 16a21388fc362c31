use colored::Color;

pub const PRIMARY: Color = Color::BrightWhite;
pub const ACCENT: Color = Color::BrightGreen;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const IPV4_ADDR: Color = Color::BrightBlue;
pub const IPV4_PREFIX: Color = Color::Blue;
pub const MAC_ADDR: Color = Color::Magenta;
pub const VENDOR: Color = Color::Cyan;
pub const PORT_OPEN: Color = Color::Green;
pub const PORT_NONE: Color = Color::BrightBlack;
pub const INCOMPLETE: Color = Color::Yellow;
