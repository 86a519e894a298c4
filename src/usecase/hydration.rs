use crate::storage::KeyValueStorage;
use crate::store::TaskStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    #[default]
    NotReady,
    Ready,
}

/// One-shot startup load. Until it has run, nothing task-dependent may be
/// rendered and no mutation may reach the store.
#[derive(Debug, Default)]
pub struct Hydrator {
    state: Readiness,
}

impl Hydrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Readiness {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == Readiness::Ready
    }

    /// Load the persisted snapshot into `store` and become ready. Returns
    /// `false` without touching the store if this already happened.
    pub fn hydrate<S: KeyValueStorage>(&mut self, store: &mut TaskStore<S>) -> bool {
        if self.is_ready() {
            return false;
        }
        let tasks = store.persistence().load();
        tracing::info!(count = tasks.len(), "hydrated task store");
        store.install(tasks);
        self.state = Readiness::Ready;
        true
    }
}
