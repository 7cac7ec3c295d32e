use crate::sync_state::ResourceType;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SyncPhase {
    Evidence,
    Facets,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SyncProgress {
    Started {
        resource: ResourceType,
    },
    Page {
        resource: ResourceType,
        records: u64,
        total: Option<u64>,
    },
    Finished {
        resource: ResourceType,
        records: u64,
        not_modified: bool,
    },
    Failed {
        resource: ResourceType,
        message: String,
    },
    PhaseStarted(SyncPhase),
    PhaseFinished(SyncPhase),
    Exit,
}
