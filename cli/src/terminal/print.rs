use std::fmt::Display;

use crate::terminal::colors;
use crate::terminal::logging::PRINT_TARGET;
use colored::*;
use tracing::info;
use unicode_width::UnicodeWidthStr;

pub const TOTAL_WIDTH: usize = 64;
const SUMMARY_KEY_WIDTH: usize = 14;

#[macro_export]
macro_rules! mprint {
    () => {
        $crate::terminal::print::print("");
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg);
    };
}

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, "{msg}");
}

/// `⟦ title ⟧` with `fill` on both sides so the line spans [`TOTAL_WIDTH`].
fn titled_rule(title: &str, fill: &str) -> String {
    let framed: String = format!("⟦ {title} ⟧");
    let free: usize = TOTAL_WIDTH.saturating_sub(UnicodeWidthStr::width(framed.as_str()));
    let left: usize = free / 2;
    format!(
        "{}{}{}",
        fill.repeat(left).color(colors::SEPARATOR),
        framed.color(colors::PRIMARY).bold(),
        fill.repeat(free - left).color(colors::SEPARATOR)
    )
}

pub fn banner() {
    print(&titled_rule(&format!("SUBRANK v{}", env!("CARGO_PKG_VERSION")), "═"));
    centerln(&format!("{}", "subdomain discovery & AI risk ranking".italic().white()));
}

pub fn section(title: &str) {
    print(&titled_rule(&title.to_uppercase(), "─"));
}

pub fn fat_separator() {
    print(&format!("{}", "═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR)));
}

/// `> Key.......: value`, the layout of the scan summary.
pub fn summary_line(key: &str, value: impl Display) {
    let dots: String = ".".repeat(SUMMARY_KEY_WIDTH.saturating_sub(key.len()));
    print(&format!(
        "{} {}{}{} {value}",
        ">".color(colors::SEPARATOR),
        key.color(colors::PRIMARY),
        dots.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR),
    ));
}

pub fn centerln(msg: &str) {
    let pad: String = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{pad}{msg}"));
}

const NO_RESULTS: &str = r#"
          _   _  ___    _     _____     _______
         | \ | |/ _ \  | |   |_ _\ \   / / ____|
         |  \| | | | | | |    | | \ \ / /|  _|
         | |\  | |_| | | |___ | |  \ V / | |___
         |_| \_|\___/  |_____|___|  \_/  |_____|

          ____  _   _ ____  ____   ___  __  __    _    ___ _   _ ____
         / ___|| | | | __ )|  _ \ / _ \|  \/  |  / \  |_ _| \ | / ___|
         \___ \| | | |  _ \| | | | | | | |\/| | / _ \  | ||  \| \___ \
          ___) | |_| | |_) | |_| | |_| | |  | |/ ___ \ | || |\  |___) |
         |____/ \___/|____/|____/ \___/|_|  |_/_/   \_\___|_| \_|____/
"#;

pub fn no_results() {
    print(&format!("{}", NO_RESULTS.red().bold()));
}
