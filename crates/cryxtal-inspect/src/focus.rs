use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context as TaskContext, Poll, Waker};

#[derive(Debug, Default)]
struct FocusSignal {
    done: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

impl FocusSignal {
    fn complete(&self) {
        self.done.set(true);
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }
}

/// Resolves once the camera settles or a later focus takes over. Dropping the
/// task does not stop the animation.
#[derive(Debug)]
#[must_use = "await the task or drop it to detach from the camera animation"]
pub struct FocusTask {
    signal: Rc<FocusSignal>,
}

impl FocusTask {
    pub fn is_finished(&self) -> bool {
        self.signal.done.get()
    }
}

impl Future for FocusTask {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<()> {
        if self.signal.done.get() {
            return Poll::Ready(());
        }
        *self.signal.waker.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}

#[derive(Debug)]
pub(crate) struct PendingFocus {
    signal: Rc<FocusSignal>,
}

impl PendingFocus {
    pub(crate) fn start() -> (Self, FocusTask) {
        let signal = Rc::new(FocusSignal::default());
        let task = FocusTask {
            signal: Rc::clone(&signal),
        };
        (Self { signal }, task)
    }

    pub(crate) fn finish(self) {
        self.signal.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_resolves_after_finish() {
        let (pending, task) = PendingFocus::start();
        assert!(!task.is_finished());
        pending.finish();
        assert!(task.is_finished());
        pollster::block_on(task);
    }
}
