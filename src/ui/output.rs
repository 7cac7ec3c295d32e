use crate::ui::theme::ScoreBand;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info),
        label.style(theme().dim),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted).to_string()
}

/// Score rendered as a percentage, colored by band
pub fn score(value: f64) -> String {
    let text = format!("{:>5.1}%", value * 100.0);
    text.style(theme().score(ScoreBand::of(value))).to_string()
}

/// Determinism marker shown next to scores
pub fn trust_marker(verified: bool) -> String {
    if verified {
        Icons::CHECK.to_string()
    } else {
        Icons::WARN.style(theme().untrusted).to_string()
    }
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim), value);
}
