pub mod icons;
pub mod output;
pub mod theme;

pub use icons::Icons;
pub use output::{
    error, header, info, livestream, prayer_count, section, success, summary_row, table_status,
    warn,
};
pub use theme::{palette, Palette, Tone};
