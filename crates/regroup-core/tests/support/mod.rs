//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use regroup_core::{
    ApiClient, ApiError, ApiRequest, ApiResponse, GroupingStore, Indicator, Method, StoreEvent,
};

/// Canned reply per `(method, path)`, optionally held until released.
#[derive(Default)]
pub struct ScriptedApi {
    replies: Mutex<HashMap<(Method, String), Result<ApiResponse, ApiError>>>,
    gates: Mutex<HashMap<String, Arc<Mutex<Receiver<()>>>>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, method: Method, path: &str, reply: Result<ApiResponse, ApiError>) {
        self.replies
            .lock()
            .expect("lock")
            .insert((method, path.to_string()), reply);
    }

    /// Block requests to `path` until the returned sender fires or drops.
    pub fn gate(&self, path: &str) -> Sender<()> {
        let (tx, rx) = mpsc::channel();
        self.gates
            .lock()
            .expect("lock")
            .insert(path.to_string(), Arc::new(Mutex::new(rx)));
        tx
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().expect("lock").clone()
    }

    pub fn count(&self, method: Method) -> usize {
        self.requests()
            .iter()
            .filter(|req| req.method == method)
            .count()
    }
}

impl ApiClient for ScriptedApi {
    fn request(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.seen.lock().expect("lock").push(request.clone());

        let gate = self.gates.lock().expect("lock").get(&request.path).cloned();
        if let Some(gate) = gate {
            let _ = gate.lock().expect("lock").recv();
        }

        self.replies
            .lock()
            .expect("lock")
            .get(&(request.method, request.path.clone()))
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError::Status {
                    status: 404,
                    detail: Some(format!("no reply scripted for {}", request.path)),
                })
            })
    }
}

#[derive(Default, Clone)]
pub struct RecordingIndicator(pub Rc<RefCell<Vec<(&'static str, String)>>>);

impl Indicator for RecordingIndicator {
    fn add_loading_message(&self, message: &str) {
        self.0.borrow_mut().push(("loading", message.to_string()));
    }

    fn add_success_message(&self, message: &str) {
        self.0.borrow_mut().push(("success", message.to_string()));
    }

    fn add_error_message(&self, message: &str) {
        self.0.borrow_mut().push(("error", message.to_string()));
    }
}

pub struct Harness {
    pub store: GroupingStore,
    pub api: Arc<ScriptedApi>,
    pub indicator: RecordingIndicator,
    pub events: Rc<RefCell<Vec<StoreEvent>>>,
}

impl Harness {
    pub fn new(api: Arc<ScriptedApi>) -> Self {
        let indicator = RecordingIndicator::default();
        let client: Arc<dyn ApiClient> = api.clone();
        let mut store = GroupingStore::new(client, Box::new(indicator.clone()));
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        Self {
            store,
            api,
            indicator,
            events,
        }
    }

    pub fn take_events(&self) -> Vec<StoreEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}
