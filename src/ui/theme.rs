//! Colors for the site's CLI output
//!
//! Output helpers pick a `Tone` from the record being shown (table
//! presence, livestream state, prayer request status) and the palette
//! turns it into a terminal style.

use owo_colors::Style;
use std::sync::OnceLock;

use crate::model::PrayerStatus;
use crate::storage::TableStatus;

static PALETTE: OnceLock<Palette> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Heading,
    Good,
    Bad,
    Caution,
    Label,
    /// On-air livestream
    Live,
}

impl From<TableStatus> for Tone {
    fn from(status: TableStatus) -> Self {
        match status {
            TableStatus::Present => Tone::Good,
            TableStatus::Missing => Tone::Bad,
        }
    }
}

impl From<PrayerStatus> for Tone {
    fn from(status: PrayerStatus) -> Self {
        match status {
            PrayerStatus::Pending => Tone::Caution,
            PrayerStatus::Approved => Tone::Good,
            PrayerStatus::Rejected => Tone::Label,
        }
    }
}

impl Tone {
    pub fn for_livestream(is_live: bool) -> Self {
        if is_live {
            Tone::Live
        } else {
            Tone::Label
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    colored: bool,
}

impl Palette {
    /// Colors only on a terminal, and never when `NO_COLOR` is set
    pub fn detect() -> Self {
        let colored =
            std::env::var_os("NO_COLOR").is_none() && console::Term::stdout().is_term();
        Self { colored }
    }

    pub fn plain() -> Self {
        Self { colored: false }
    }

    pub fn is_colored(&self) -> bool {
        self.colored
    }

    pub fn style(&self, tone: Tone) -> Style {
        if !self.colored {
            return Style::new();
        }
        match tone {
            Tone::Heading => Style::new().cyan().bold(),
            Tone::Good => Style::new().green().bold(),
            Tone::Bad => Style::new().red().bold(),
            Tone::Caution => Style::new().yellow().bold(),
            Tone::Label => Style::new().bright_black(),
            Tone::Live => Style::new().white().on_red().bold(),
        }
    }
}

pub fn palette() -> &'static Palette {
    PALETTE.get_or_init(Palette::detect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tones_follow_record_state() {
        assert_eq!(Tone::from(TableStatus::Missing), Tone::Bad);
        assert_eq!(Tone::from(TableStatus::Present), Tone::Good);
        assert_eq!(Tone::from(PrayerStatus::Pending), Tone::Caution);
        assert_eq!(Tone::for_livestream(true), Tone::Live);
        assert_eq!(Tone::for_livestream(false), Tone::Label);
    }

    #[test]
    fn test_plain_palette_never_colors() {
        let palette = Palette::plain();
        assert!(!palette.is_colored());
        let styled = format!(
            "{}",
            owo_colors::OwoColorize::style(&"live", palette.style(Tone::Live))
        );
        assert_eq!(styled, "live");
    }
}
