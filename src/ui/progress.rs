use crate::sync::SyncSummary;
use crate::sync_state::ResourceType;
use crate::ui::progress_message::{SyncPhase, SyncProgress};
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::collections::HashMap;
use std::thread;
use std::time::Duration;

fn is_term() -> bool {
    console::Term::stdout().is_term()
}

fn spinner(mp: &MultiProgress, message: String) -> ProgressBar {
    if !is_term() {
        return ProgressBar::hidden();
    }
    let pb = mp.add(ProgressBar::new_spinner().with_message(message));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn counted_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Renders sync progress messages as one bar per resource.
///
/// The rendering thread owns the bars; the engine only holds the sender.
pub struct ProgressManager {
    mp: MultiProgress,
    tx: crossbeam::channel::Sender<SyncProgress>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ProgressManager {
    pub fn new() -> (Self, crossbeam::channel::Sender<SyncProgress>) {
        let (tx, rx) = crossbeam::channel::unbounded::<SyncProgress>();
        let mp = MultiProgress::new();
        let mp_clone = mp.clone();

        let handle = thread::spawn(move || {
            let mut bars: HashMap<ResourceType, ProgressBar> = HashMap::new();
            let mut phase: Option<ProgressBar> = None;

            for msg in rx {
                match msg {
                    SyncProgress::Started { resource } => {
                        let pb = spinner(&mp_clone, format!("Syncing {}", resource));
                        bars.insert(resource, pb);
                    }
                    SyncProgress::Page { resource, records, total } => {
                        if let Some(pb) = bars.get(&resource) {
                            if let Some(total) = total {
                                if pb.length().is_none() {
                                    pb.set_style(counted_style());
                                }
                                pb.set_length(total.max(records));
                            }
                            pb.set_position(records);
                        }
                    }
                    SyncProgress::Finished { resource, records, not_modified } => {
                        if let Some(pb) = bars.remove(&resource) {
                            let done = if not_modified {
                                format!("{} unchanged", resource)
                            } else {
                                format!("{} {} records", resource, records)
                            };
                            pb.finish_with_message(done);
                        }
                    }
                    SyncProgress::Failed { resource, message } => {
                        if let Some(pb) = bars.remove(&resource) {
                            pb.abandon_with_message(format!("{} failed: {}", resource, message));
                        }
                    }
                    SyncProgress::PhaseStarted(p) => {
                        let label = match p {
                            SyncPhase::Evidence => "Fetching evidence",
                            SyncPhase::Facets => "Rebuilding facets",
                        };
                        phase = Some(spinner(&mp_clone, label.to_string()));
                    }
                    SyncProgress::PhaseFinished(_) => {
                        if let Some(pb) = phase.take() {
                            pb.finish_and_clear();
                        }
                    }
                    SyncProgress::Exit => break,
                }
            }
        });

        (
            Self {
                mp,
                tx: tx.clone(),
                handle: Some(handle),
            },
            tx,
        )
    }

    pub fn clear(&self) {
        self.mp.clear().ok();
    }

    /// Stop the rendering thread and clear the bars
    pub fn finish(mut self) {
        let _ = self.tx.send(SyncProgress::Exit);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.clear();
    }

    /// Stop rendering and print the pass summary
    pub fn finish_with_summary(self, summary: &SyncSummary) {
        self.finish();

        let records: u64 = summary.resources.iter().map(|r| r.records_synced).sum();
        println!();
        if summary.is_complete() {
            println!(
                "{} {}",
                Icons::CHECK.style(theme().success),
                format!("Sync complete in {}", HumanDuration(summary.duration)).style(theme().success)
            );
        } else {
            println!(
                "{} {}",
                Icons::WARN.style(theme().warn),
                format!(
                    "Sync finished with {} failed resource(s) in {}",
                    summary.failed.len(),
                    HumanDuration(summary.duration)
                )
                .style(theme().warn)
            );
        }
        println!(
            "  {} {} records  {} {} rejected  {} {} facet buckets",
            Icons::PACKAGE.style(theme().info),
            records,
            Icons::CROSS.style(theme().info),
            summary.total_rejected(),
            Icons::STATS.style(theme().info),
            summary.facet_buckets
        );
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_message(message.to_string());
        if is_term() {
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        Self { pb }
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}
