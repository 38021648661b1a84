use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::BrightCyan;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const HIGH_RISK: Color = Color::BrightRed;
pub const MEDIUM_RISK: Color = Color::BrightYellow;
pub const LOW_RISK: Color = Color::BrightBlue;

pub const IPV4_ADDR: Color = Color::BrightCyan;
pub const IPV6_ADDR: Color = Color::Cyan;
