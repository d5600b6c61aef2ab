use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::cell::Deferred;
use crate::observer::Observer;

/// Future over a cell's settlement, created by [`Deferred::waiter`].
///
/// Resolves to `Ok` on fulfillment and `Err` on rejection. The waiter is an
/// ordinary observer pair underneath, so it sees the carried value as of its
/// position in the registration order.
///
/// # Examples
///
/// ```
/// use deferred_cell::Deferred;
/// use futures::executor::block_on;
///
/// let cell: Deferred<String, String> = Deferred::new();
/// let waiter = cell.waiter();
/// cell.resolve("ready".into()).unwrap();
/// assert_eq!(block_on(waiter), Ok("ready".to_string()));
/// ```
pub struct Waiter<T, E> {
    slot: Rc<RefCell<Slot<T, E>>>,
}

struct Slot<T, E> {
    outcome: Option<Result<T, E>>,
    waker: Option<Waker>,
}

impl<T: Clone + 'static, E: Clone + 'static> Deferred<T, E> {
    /// Build a [`Waiter`] future over this cell's settlement.
    pub fn waiter(&self) -> Waiter<T, E> {
        let slot = Rc::new(RefCell::new(Slot {
            outcome: None,
            waker: None,
        }));
        let on_value = {
            let slot = Rc::clone(&slot);
            Observer::direct(move |value: &T| {
                deliver(&slot, Ok(value.clone()));
                None
            })
        };
        let on_error = {
            let slot = Rc::clone(&slot);
            Observer::direct(move |error: &E| {
                deliver(&slot, Err(error.clone()));
                None
            })
        };
        self.observe(Some(on_value), Some(on_error));
        Waiter { slot }
    }
}

fn deliver<T, E>(slot: &Rc<RefCell<Slot<T, E>>>, outcome: Result<T, E>) {
    let mut slot = slot.borrow_mut();
    slot.outcome = Some(outcome);
    if let Some(waker) = slot.waker.take() {
        waker.wake();
    }
}

impl<T, E> Future for Waiter<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.borrow_mut();
        match slot.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
