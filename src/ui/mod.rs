pub mod icons;
pub mod output;
pub mod progress;
pub mod progress_message;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, header, info, muted, score, section, success, summary_row, trust_marker, warn};
pub use progress::{ProgressManager, Spinner};
pub use progress_message::{SyncPhase, SyncProgress};
pub use table::{company_table, facet_table, stats_table, TableBuilder};
pub use theme::{theme, ScoreBand, Theme};
