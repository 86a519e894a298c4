use crate::domain::task::{Summary, Task, TaskId};
use crate::storage::KeyValueStorage;

pub mod persist;

use persist::{PersistError, TaskPersistence};

pub type Listener = Box<dyn FnMut(&[Task])>;

/// Owns the task collection. Every mutation that changes state writes the
/// whole collection through to storage and then notifies listeners.
pub struct TaskStore<S> {
    tasks: Vec<Task>,
    persistence: TaskPersistence<S>,
    listeners: Vec<Listener>,
    last_persist_error: Option<PersistError>,
}

impl<S: KeyValueStorage> TaskStore<S> {
    pub fn new(persistence: TaskPersistence<S>) -> Self {
        Self {
            tasks: Vec::new(),
            persistence,
            listeners: Vec::new(),
            last_persist_error: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.tasks)
    }

    pub fn persistence(&self) -> &TaskPersistence<S> {
        &self.persistence
    }

    /// Error from the most recent write, cleared once a write succeeds.
    pub fn last_persist_error(&self) -> Option<&PersistError> {
        self.last_persist_error.as_ref()
    }

    /// `listener` is called synchronously with the new collection after each
    /// change.
    pub fn subscribe(&mut self, listener: impl FnMut(&[Task]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Replace the collection without writing it back. Only hydration uses this.
    pub fn install(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.publish();
    }

    pub fn add_task(&mut self, raw_text: &str) -> Option<TaskId> {
        let text = raw_text.trim();
        if text.is_empty() {
            return None;
        }
        let id = self.fresh_id();
        self.tasks.insert(0, Task::new(id.clone(), text));
        tracing::debug!(%id, "added task");
        self.commit();
        Some(id)
    }

    pub fn toggle_task(&mut self, id: &TaskId) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| &t.id == id) else {
            return false;
        };
        task.completed = !task.completed;
        tracing::debug!(%id, completed = task.completed, "toggled task");
        self.commit();
        true
    }

    pub fn delete_task(&mut self, id: &TaskId) -> bool {
        let Some(pos) = self.tasks.iter().position(|t| &t.id == id) else {
            return false;
        };
        self.tasks.remove(pos);
        tracing::debug!(%id, "deleted task");
        self.commit();
        true
    }

    pub fn clear_all(&mut self) {
        let cleared = self.tasks.len();
        self.tasks.clear();
        tracing::debug!(cleared, "cleared all tasks");
        self.commit();
    }

    fn fresh_id(&self) -> TaskId {
        loop {
            let id = TaskId::generate();
            if !self.tasks.iter().any(|t| t.id == id) {
                return id;
            }
        }
    }

    fn commit(&mut self) {
        match self.persistence.save(&self.tasks) {
            Ok(()) => self.last_persist_error = None,
            Err(err) => {
                tracing::warn!(error = %err, count = self.tasks.len(), "failed to persist tasks");
                self.last_persist_error = Some(err);
            }
        }
        self.publish();
    }

    fn publish(&mut self) {
        for listener in &mut self.listeners {
            listener(&self.tasks);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    use super::*;
    use crate::storage::memory::MemoryStorage;
    use crate::storage::{STORAGE_KEY, StorageError};

    /// Counts writes so tests can assert that no-ops stay off storage.
    #[derive(Default)]
    struct CountingStorage {
        inner: MemoryStorage,
        writes: usize,
    }

    impl KeyValueStorage for CountingStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get_item(key)
        }

        fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.writes += 1;
            self.inner.set_item(key, value)
        }
    }

    fn store() -> TaskStore<CountingStorage> {
        TaskStore::new(TaskPersistence::new(CountingStorage::default()))
    }

    fn writes(store: &TaskStore<CountingStorage>) -> usize {
        store.persistence().storage().writes
    }

    fn persisted(store: &TaskStore<CountingStorage>) -> Option<String> {
        store.persistence().storage().get_item(STORAGE_KEY).unwrap()
    }

    #[test]
    fn add_prepends_trimmed_open_task() {
        let mut store = store();
        store.add_task("first").unwrap();
        let id = store.add_task("  Buy milk  ").unwrap();

        let tasks = store.tasks();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, id);
        assert_eq!(tasks[0].text, "Buy milk");
        assert!(!tasks[0].completed);
        assert_eq!(tasks[1].text, "first");
        assert_eq!(writes(&store), 2);
    }

    #[test]
    fn blank_input_is_ignored_without_write() {
        let mut store = store();
        assert_eq!(store.add_task(""), None);
        assert_eq!(store.add_task("   "), None);
        assert_eq!(store.add_task("\t\n"), None);
        assert!(store.tasks().is_empty());
        assert_eq!(writes(&store), 0);
        assert_eq!(persisted(&store), None);
    }

    #[test]
    fn added_task_is_first_after_reload() {
        let mut store = store();
        store.add_task("older").unwrap();
        store.add_task("Buy milk").unwrap();

        let loaded = store.persistence().load();
        assert_eq!(loaded[0].text, "Buy milk");
        assert!(!loaded[0].completed);
    }

    #[test]
    fn ids_stay_unique() {
        let mut store = store();
        for i in 0..50 {
            store.add_task(&format!("task {i}"));
        }
        let first = store.tasks()[10].id.clone();
        store.delete_task(&first);
        store.add_task("again");

        let ids: HashSet<_> = store.tasks().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), store.tasks().len());
        assert!(!ids.contains(&first));
    }

    #[test]
    fn toggle_twice_restores_and_leaves_others_alone() {
        let mut store = store();
        let a = store.add_task("a").unwrap();
        let b = store.add_task("b").unwrap();
        store.toggle_task(&b);
        let before = store.tasks().to_vec();

        assert!(store.toggle_task(&a));
        assert!(store.tasks()[1].completed);
        assert!(store.tasks()[0].completed);
        assert!(store.toggle_task(&a));

        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn toggle_unknown_id_is_noop() {
        let mut store = store();
        store.add_task("a").unwrap();
        let before = store.tasks().to_vec();
        let writes_before = writes(&store);

        assert!(!store.toggle_task(&TaskId::from("missing")));
        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(writes(&store), writes_before);
    }

    #[test]
    fn delete_keeps_order_of_survivors() {
        let mut store = store();
        store.add_task("c").unwrap();
        let b = store.add_task("b").unwrap();
        store.add_task("a").unwrap();

        assert!(store.delete_task(&b));
        let texts: Vec<_> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["a", "c"]);
        assert_eq!(store.persistence().load(), store.tasks());
    }

    #[test]
    fn delete_unknown_id_is_noop() {
        let mut store = store();
        store.add_task("a").unwrap();
        let before = store.tasks().to_vec();
        let writes_before = writes(&store);

        assert!(!store.delete_task(&TaskId::from("missing")));
        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(writes(&store), writes_before);
    }

    #[test]
    fn clear_all_is_idempotent() {
        let mut store = store();
        store.add_task("a").unwrap();
        store.add_task("b").unwrap();

        store.clear_all();
        let once = (store.tasks().to_vec(), persisted(&store));
        store.clear_all();
        let twice = (store.tasks().to_vec(), persisted(&store));

        assert!(once.0.is_empty());
        assert_eq!(once, twice);
        assert_eq!(persisted(&store).as_deref(), Some("[]"));
    }

    #[test]
    fn listeners_see_every_change_synchronously() {
        let mut store = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |tasks| sink.borrow_mut().push(tasks.len()));

        let id = store.add_task("a").unwrap();
        assert_eq!(*seen.borrow(), [1]);
        store.add_task(" ");
        store.toggle_task(&id);
        store.delete_task(&TaskId::from("missing"));
        store.delete_task(&id);
        store.install(vec![Task::new(TaskId::from("x"), "X")]);

        assert_eq!(*seen.borrow(), [1, 1, 0, 1]);
    }

    #[test]
    fn install_does_not_write() {
        let mut store = store();
        store.install(vec![Task::new(TaskId::from("a"), "X")]);
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(writes(&store), 0);
    }

    #[test]
    fn failed_write_keeps_memory_state() {
        let storage = MemoryStorage::default().with_quota(128);
        let mut store = TaskStore::new(TaskPersistence::new(storage));

        store.add_task("short").unwrap();
        assert!(store.last_persist_error().is_none());

        store
            .add_task("a much longer task text that will not fit in the quota")
            .unwrap();
        assert_eq!(store.tasks().len(), 2);
        assert!(matches!(
            store.last_persist_error(),
            Some(PersistError::Storage(StorageError::QuotaExceeded { .. }))
        ));
        assert_eq!(store.persistence().load().len(), 1);

        let first = store.tasks()[0].id.clone();
        store.delete_task(&first);
        assert!(store.last_persist_error().is_none());
        assert_eq!(store.persistence().load(), store.tasks());
    }
}
