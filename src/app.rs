use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::domain::task::{Summary, Task, TaskId};
use crate::storage::KeyValueStorage;
use crate::store::TaskStore;
use crate::usecase::hydration::Hydrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App<S: KeyValueStorage> {
    store: TaskStore<S>,
    hydrator: Hydrator,
    view: Rc<RefCell<Vec<Task>>>,
    pub selected: usize,
    pub mode: InputMode,
    pub input: String,
    pub status: Option<String>,
}

impl<S: KeyValueStorage> App<S> {
    pub fn new(mut store: TaskStore<S>) -> Self {
        let view = Rc::new(RefCell::new(store.tasks().to_vec()));
        let sink = Rc::clone(&view);
        store.subscribe(move |tasks| *sink.borrow_mut() = tasks.to_vec());
        Self {
            store,
            hydrator: Hydrator::new(),
            view,
            selected: 0,
            mode: InputMode::Normal,
            input: String::new(),
            status: None,
        }
    }

    pub fn hydrate(&mut self) {
        self.hydrator.hydrate(&mut self.store);
    }

    pub fn is_ready(&self) -> bool {
        self.hydrator.is_ready()
    }

    /// Latest snapshot published by the store.
    pub fn tasks(&self) -> Ref<'_, Vec<Task>> {
        self.view.borrow()
    }

    pub fn summary(&self) -> Summary {
        self.store.summary()
    }

    pub fn select_next(&mut self) {
        let len = self.tasks().len();
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.tasks().get(self.selected).map(|t| t.id.clone())
    }

    pub fn start_editing(&mut self) {
        if !self.is_ready() {
            return;
        }
        self.mode = InputMode::Editing;
        self.input.clear();
        self.set_status("Type new task and press Enter");
    }

    pub fn cancel_editing(&mut self) {
        self.mode = InputMode::Normal;
        self.input.clear();
        self.set_status("Canceled");
    }

    pub fn add_task(&mut self) {
        if !self.is_ready() {
            return;
        }
        if self.store.add_task(&self.input).is_none() {
            self.set_status("Cannot add an empty task");
            return;
        }
        self.input.clear();
        self.mode = InputMode::Normal;
        self.selected = 0;
        self.after_write("Added");
    }

    pub fn toggle_selected(&mut self) {
        if !self.is_ready() {
            return;
        }
        if let Some(id) = self.selected_id()
            && self.store.toggle_task(&id)
        {
            self.after_write("Toggled completion");
        }
    }

    pub fn delete_selected(&mut self) {
        if !self.is_ready() {
            return;
        }
        if let Some(id) = self.selected_id()
            && self.store.delete_task(&id)
        {
            if self.selected > 0 {
                self.selected -= 1;
            }
            self.clamp_selection();
            self.after_write("Deleted");
        }
    }

    pub fn clear_all(&mut self) {
        if !self.is_ready() {
            return;
        }
        self.store.clear_all();
        self.selected = 0;
        self.after_write("Cleared workspace");
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status = Some(msg.to_string());
    }

    fn clamp_selection(&mut self) {
        let len = self.tasks().len();
        if self.selected >= len && len > 0 {
            self.selected = len - 1;
        }
    }

    fn after_write(&mut self, done: &str) {
        let msg = match self.store.last_persist_error() {
            Some(err) => format!("{done}, but could not save: {err}"),
            None => done.to_string(),
        };
        self.set_status(&msg);
    }
}
