use crate::model::{Livestream, PrayerStatus};
use crate::storage::TableStatus;
use crate::ui::{palette, Icons, Tone};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::CHURCH, text.style(palette().style(Tone::Heading)));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(palette().style(Tone::Good)));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(palette().style(Tone::Bad)));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(palette().style(Tone::Caution)));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(palette().style(Tone::Heading)),
        label.style(palette().style(Tone::Label)),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(palette().style(Tone::Heading)));
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(palette().style(Tone::Label)), value);
}

/// One line of `status` output for a content table
pub fn table_status(table: &str, status: TableStatus) {
    let word = match status {
        TableStatus::Present => "present",
        TableStatus::Missing => "missing",
    };
    println!("  {} {}", word.style(palette().style(status.into())), table);
}

/// Current livestream row, or a note that none is stored yet
pub fn livestream(current: Option<&Livestream>) {
    match current {
        Some(stream) => {
            let state = if stream.is_live { " LIVE " } else { "offline" };
            println!(
                "  {} {}",
                state.style(palette().style(Tone::for_livestream(stream.is_live))),
                stream.youtube_id
            );
        }
        None => println!("  {}", "no livestream row".style(palette().style(Tone::Label))),
    }
}

pub fn prayer_count(status: PrayerStatus, count: usize) {
    println!(
        "  {} {}",
        format!("{}:", status.as_str()).style(palette().style(status.into())),
        count
    );
}
