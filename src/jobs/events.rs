use crate::jobs::JobProgressEvent;
use crate::shared::JobId;
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug)]
struct Subscriber {
    id: u64,
    scope: Option<JobId>,
    sender: Sender<JobProgressEvent>,
}

/// Fan-out of progress events to channel subscribers.
///
/// A subscriber scoped to one job is removed right after that job's terminal
/// event is delivered, which closes its channel. Subscribers whose receiver is
/// gone are pruned on the next publish.
#[derive(Debug, Default)]
pub(crate) struct ProgressBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl ProgressBus {
    pub(crate) fn subscribe(&mut self, scope: Option<JobId>) -> (u64, Receiver<JobProgressEvent>) {
        let (sender, receiver) = mpsc::channel();
        self.next_id += 1;
        let id = self.next_id;
        self.subscribers.push(Subscriber { id, scope, sender });
        (id, receiver)
    }

    pub(crate) fn unsubscribe(&mut self, id: u64) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|subscriber| subscriber.id != id);
        self.subscribers.len() != before
    }

    pub(crate) fn publish(&mut self, event: &JobProgressEvent) {
        self.subscribers.retain(|subscriber| {
            if subscriber
                .scope
                .as_ref()
                .is_some_and(|scope| *scope != event.job_id)
            {
                return true;
            }
            if subscriber.sender.send(event.clone()).is_err() {
                return false;
            }
            !(subscriber.scope.is_some() && event.kind.is_terminal())
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.subscribers.len()
    }
}
