use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use lockstep_shared::{Dispatcher, QueueKind};

/// Runs the node thread and the command thread of one process until
/// dropped
pub struct QueuePump {
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl QueuePump {
    pub fn start(dispatcher: &Arc<Dispatcher>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let threads = [QueueKind::NodeThread, QueueKind::CommandThread]
            .into_iter()
            .map(|kind| {
                let dispatcher = dispatcher.clone();
                let stop = stop.clone();
                thread::spawn(move || dispatcher.run(kind, &stop))
            })
            .collect();
        Self { stop, threads }
    }
}

impl Drop for QueuePump {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}
