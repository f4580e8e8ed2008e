use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use hidkitd::exec::{ActionRequest, ActionRunner};

/// An action runner that:
/// - records every request it receives, script or not
/// - never starts a process.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    requests: Arc<Mutex<Vec<ActionRequest>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request, in the order received.
    pub fn requests(&self) -> Vec<ActionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Scripts that would have been launched, in order.
    pub fn launches(&self) -> Vec<PathBuf> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.script.clone())
            .collect()
    }
}

impl ActionRunner for RecordingRunner {
    fn run_action(
        &mut self,
        request: ActionRequest,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        let requests = Arc::clone(&self.requests);

        Box::pin(async move {
            requests.lock().unwrap().push(request);
        })
    }
}
