use crate::sync_state::SyncStatus;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Score bands used when coloring `final_score`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    High,
    Mid,
    Low,
}

impl ScoreBand {
    pub const HIGH_FROM: f64 = 0.8;
    pub const MID_FROM: f64 = 0.4;

    pub fn of(score: f64) -> Self {
        if score >= Self::HIGH_FROM {
            ScoreBand::High
        } else if score >= Self::MID_FROM {
            ScoreBand::Mid
        } else {
            ScoreBand::Low
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    pub muted: Style,
    pub score_high: Style,
    pub score_mid: Style,
    pub score_low: Style,
    /// Records failing the determinism check
    pub untrusted: Style,
    pub sync_failed: Style,
    pub sync_pending: Style,
}

impl Theme {
    pub fn detect() -> Self {
        if !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
            muted: Style::new().bright_black(),
            score_high: Style::new().green().bold(),
            score_mid: Style::new().yellow(),
            score_low: Style::new().red(),
            untrusted: Style::new().yellow().bold(),
            sync_failed: Style::new().red().bold(),
            sync_pending: Style::new().yellow(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            warn: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            muted: Style::new(),
            score_high: Style::new(),
            score_mid: Style::new(),
            score_low: Style::new(),
            untrusted: Style::new(),
            sync_failed: Style::new(),
            sync_pending: Style::new(),
        }
    }

    pub fn score(&self, band: ScoreBand) -> Style {
        match band {
            ScoreBand::High => self.score_high,
            ScoreBand::Mid => self.score_mid,
            ScoreBand::Low => self.score_low,
        }
    }

    /// Fresh successes read as success; stale, pending and running states as pending
    pub fn sync_status(&self, status: SyncStatus, stale: bool) -> Style {
        match status {
            SyncStatus::Success if !stale => self.success,
            SyncStatus::Error => self.sync_failed,
            _ => self.sync_pending,
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_band_boundaries() {
        assert_eq!(ScoreBand::of(1.0), ScoreBand::High);
        assert_eq!(ScoreBand::of(0.8), ScoreBand::High);
        assert_eq!(ScoreBand::of(0.79), ScoreBand::Mid);
        assert_eq!(ScoreBand::of(0.4), ScoreBand::Mid);
        assert_eq!(ScoreBand::of(0.39), ScoreBand::Low);
        assert_eq!(ScoreBand::of(0.0), ScoreBand::Low);
    }

    #[test]
    fn test_plain_theme_leaves_text_unstyled() {
        use owo_colors::OwoColorize;

        let theme = Theme::plain();
        let text = "0.91".style(theme.score(ScoreBand::High)).to_string();
        assert_eq!(text, "0.91");
        let text = "error".style(theme.sync_status(SyncStatus::Error, false)).to_string();
        assert_eq!(text, "error");
    }
}
