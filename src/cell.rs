use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use crate::observer::{Advance, Observer};
use crate::Error;

/// Which way a cell settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Fulfilled,
    Rejected,
}

/// A settle-once deferred value cell.
///
/// A `Deferred<T, E>` is eventually fulfilled with a `T` or rejected with an
/// `E`, exactly once. Observers registered before settlement fire in
/// registration order when the cell settles; observers registered afterwards
/// fire synchronously inside the registration call. Cloning the handle is
/// cheap and every clone refers to the same cell.
///
/// # Examples
///
/// ```
/// use deferred_cell::Deferred;
///
/// let cell: Deferred<String, String> = Deferred::new();
/// cell.then(|greeting| {
///     assert_eq!(greeting, "hello");
///     None
/// });
/// cell.resolve("hello".into()).unwrap();
/// assert!(cell.is_settled());
/// ```
pub struct Deferred<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

enum State<T, E> {
    Unsettled,
    // The slot is None while the carried value is lent out to an in-flight
    // observer; settledness is the variant, not slot occupancy.
    Fulfilled(Option<T>),
    Rejected(Option<E>),
}

struct Inner<T, E> {
    state: State<T, E>,
    on_fulfilled: VecDeque<Observer<T>>,
    on_rejected: VecDeque<Observer<E>>,
    on_progress: Vec<Box<dyn FnMut(&T)>>,
    // True while a drain loop or an async suspension owns the chain.
    // Registrations made in that window append only; the owner reaches them.
    traversing: bool,
    parent: Option<Weak<RefCell<Inner<T, E>>>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static, E: 'static> Default for Deferred<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = self.inner.borrow();
        let state = match cell.state {
            State::Unsettled => "unsettled",
            State::Fulfilled(_) => "fulfilled",
            State::Rejected(_) => "rejected",
        };
        f.debug_struct("Deferred")
            .field("state", &state)
            .field("on_fulfilled", &cell.on_fulfilled.len())
            .field("on_rejected", &cell.on_rejected.len())
            .finish()
    }
}

impl<T: 'static, E: 'static> Deferred<T, E> {
    /// Create an unsettled cell.
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<Weak<RefCell<Inner<T, E>>>>) -> Self {
        Deferred {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Unsettled,
                on_fulfilled: VecDeque::new(),
                on_rejected: VecDeque::new(),
                on_progress: Vec::new(),
                traversing: false,
                parent,
            })),
        }
    }

    pub(crate) fn child_of(&self) -> Self {
        Self::with_parent(Some(Rc::downgrade(&self.inner)))
    }

    /// Fulfill the cell and synchronously run every fulfillment observer up
    /// to the first suspension point.
    ///
    /// A second settlement attempt of either kind leaves the first outcome in
    /// place and reports [`Error::AlreadySettled`]; callers racing two
    /// producers can ignore the result with `let _ =`.
    ///
    /// ```
    /// use deferred_cell::{Deferred, Error};
    ///
    /// let cell: Deferred<&str, &str> = Deferred::new();
    /// cell.resolve("first").unwrap();
    /// assert_eq!(cell.reject("too slow"), Err(Error::AlreadySettled));
    /// ```
    pub fn resolve(&self, value: T) -> Result<(), Error> {
        {
            let mut cell = self.inner.borrow_mut();
            if !matches!(cell.state, State::Unsettled) {
                return Err(Error::AlreadySettled);
            }
            cell.state = State::Fulfilled(Some(value));
            // the losing kind's queue is discarded unfired
            cell.on_rejected.clear();
        }
        drain_fulfilled(&self.inner);
        Ok(())
    }

    /// Reject the cell and synchronously run every rejection observer up to
    /// the first suspension point. Settle-once semantics match
    /// [`resolve`](Deferred::resolve).
    pub fn reject(&self, error: E) -> Result<(), Error> {
        {
            let mut cell = self.inner.borrow_mut();
            if !matches!(cell.state, State::Unsettled) {
                return Err(Error::AlreadySettled);
            }
            cell.state = State::Rejected(Some(error));
            cell.on_fulfilled.clear();
        }
        drain_rejected(&self.inner);
        Ok(())
    }

    /// Combined settlement: `Ok` fulfills, `Err` rejects.
    pub fn settle(&self, outcome: Result<T, E>) -> Result<(), Error> {
        match outcome {
            Ok(value) => self.resolve(value),
            Err(error) => self.reject(error),
        }
    }

    /// Error-first adapter: a one-shot function that settles this cell, for
    /// handing to code that reports success or failure through a callback.
    ///
    /// ```
    /// use deferred_cell::Deferred;
    ///
    /// fn read_config(done: impl FnOnce(Result<String, String>)) {
    ///     done(Ok("port=7777".into()));
    /// }
    ///
    /// let cell: Deferred<String, String> = Deferred::new();
    /// read_config(|outcome| {
    ///     let _ = cell.settler()(outcome);
    /// });
    /// assert!(cell.is_settled());
    /// ```
    pub fn settler(&self) -> impl FnOnce(Result<T, E>) -> Result<(), Error> {
        let cell = self.clone();
        move |outcome| cell.settle(outcome)
    }

    /// Register an observer for the fulfillment queue. Returns a handle to
    /// the same cell for chaining.
    ///
    /// If the cell is already fulfilled the observer runs synchronously
    /// before this call returns, unless a traversal is in flight, in which
    /// case it is appended and reached when draining resumes. Registrations
    /// against the losing kind of a settled cell are dropped unfired.
    pub fn on_fulfilled(&self, observer: Observer<T>) -> Self {
        let settled = {
            let mut cell = self.inner.borrow_mut();
            match cell.state {
                State::Rejected(_) => return self.clone(),
                State::Unsettled => {
                    cell.on_fulfilled.push_back(observer);
                    false
                }
                State::Fulfilled(_) => {
                    cell.on_fulfilled.push_back(observer);
                    true
                }
            }
        };
        if settled {
            drain_fulfilled(&self.inner);
        }
        self.clone()
    }

    /// Register an observer for the rejection queue. Semantics mirror
    /// [`on_fulfilled`](Deferred::on_fulfilled).
    pub fn on_rejected(&self, observer: Observer<E>) -> Self {
        let settled = {
            let mut cell = self.inner.borrow_mut();
            match cell.state {
                State::Fulfilled(_) => return self.clone(),
                State::Unsettled => {
                    cell.on_rejected.push_back(observer);
                    false
                }
                State::Rejected(_) => {
                    cell.on_rejected.push_back(observer);
                    true
                }
            }
        };
        if settled {
            drain_rejected(&self.inner);
        }
        self.clone()
    }

    /// Chaining entry point registering both sides in one call; either side
    /// may be omitted.
    pub fn observe(
        &self,
        on_value: Option<Observer<T>>,
        on_error: Option<Observer<E>>,
    ) -> Self {
        if let Some(observer) = on_value {
            self.on_fulfilled(observer);
        }
        if let Some(observer) = on_error {
            self.on_rejected(observer);
        }
        self.clone()
    }

    /// Direct-form fulfillment sugar.
    pub fn then<F>(&self, f: F) -> Self
    where
        F: FnOnce(&T) -> Option<T> + 'static,
    {
        self.on_fulfilled(Observer::direct(f))
    }

    /// Direct-form rejection sugar.
    pub fn fail<F>(&self, f: F) -> Self
    where
        F: FnOnce(&E) -> Option<E> + 'static,
    {
        self.on_rejected(Observer::direct(f))
    }

    /// Subscribe to the progress side channel. Progress subscribers are
    /// never dequeued and have no ordering relationship with settlement.
    pub fn on_progress<F>(&self, f: F) -> Self
    where
        F: FnMut(&T) + 'static,
    {
        self.inner.borrow_mut().on_progress.push(Box::new(f));
        self.clone()
    }

    /// Raise a progress signal to every current subscriber. Returns whether
    /// anyone was listening.
    pub fn progress(&self, update: &T) -> bool {
        let mut subscribers = mem::take(&mut self.inner.borrow_mut().on_progress);
        if subscribers.is_empty() {
            return false;
        }
        for subscriber in &mut subscribers {
            subscriber(update);
        }
        let mut cell = self.inner.borrow_mut();
        let added = mem::take(&mut cell.on_progress);
        subscribers.extend(added);
        cell.on_progress = subscribers;
        true
    }

    /// Step back up to the cell this one was projected from, or the cell
    /// itself when there is no parent.
    pub fn parent(&self) -> Self {
        let parent = self.inner.borrow().parent.as_ref().and_then(Weak::upgrade);
        match parent {
            Some(inner) => Deferred { inner },
            None => self.clone(),
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self.inner.borrow().state, State::Unsettled)
    }

    pub fn kind(&self) -> Option<Kind> {
        match self.inner.borrow().state {
            State::Unsettled => None,
            State::Fulfilled(_) => Some(Kind::Fulfilled),
            State::Rejected(_) => Some(Kind::Rejected),
        }
    }
}

fn drain_fulfilled<T: 'static, E: 'static>(inner: &Rc<RefCell<Inner<T, E>>>) {
    let value = {
        let mut cell = inner.borrow_mut();
        if cell.traversing {
            return;
        }
        let taken = match &mut cell.state {
            State::Fulfilled(slot) => slot.take(),
            _ => None,
        };
        match taken {
            Some(value) => {
                cell.traversing = true;
                value
            }
            None => return,
        }
    };
    resume_fulfilled(inner, value);
}

fn drain_rejected<T: 'static, E: 'static>(inner: &Rc<RefCell<Inner<T, E>>>) {
    let error = {
        let mut cell = inner.borrow_mut();
        if cell.traversing {
            return;
        }
        let taken = match &mut cell.state {
            State::Rejected(slot) => slot.take(),
            _ => None,
        };
        match taken {
            Some(error) => {
                cell.traversing = true;
                error
            }
            None => return,
        }
    };
    resume_rejected(inner, error);
}

// The drain loop proper. The carried value lives in a local while observers
// run, so re-entrant calls on the same cell (registering more observers,
// attempting a second settlement, raising progress) see no outstanding
// borrow. Observer panics are not caught and abort the traversal stack.
fn resume_fulfilled<T: 'static, E: 'static>(inner: &Rc<RefCell<Inner<T, E>>>, mut value: T) {
    loop {
        let observer = {
            let mut cell = inner.borrow_mut();
            match cell.on_fulfilled.pop_front() {
                Some(observer) => observer,
                None => {
                    cell.state = State::Fulfilled(Some(value));
                    cell.traversing = false;
                    return;
                }
            }
        };
        match observer {
            Observer::Direct(f) => {
                if let Some(replacement) = f(&value) {
                    value = replacement;
                }
            }
            Observer::Continuable(f) => {
                let handle = Rc::clone(inner);
                let advance = Advance::new(move |next: T| resume_fulfilled(&handle, next));
                f(value, advance);
                return;
            }
        }
    }
}

fn resume_rejected<T: 'static, E: 'static>(inner: &Rc<RefCell<Inner<T, E>>>, mut error: E) {
    loop {
        let observer = {
            let mut cell = inner.borrow_mut();
            match cell.on_rejected.pop_front() {
                Some(observer) => observer,
                None => {
                    cell.state = State::Rejected(Some(error));
                    cell.traversing = false;
                    return;
                }
            }
        };
        match observer {
            Observer::Direct(f) => {
                if let Some(replacement) = f(&error) {
                    error = replacement;
                }
            }
            Observer::Continuable(f) => {
                let handle = Rc::clone(inner);
                let advance = Advance::new(move |next: E| resume_rejected(&handle, next));
                f(error, advance);
                return;
            }
        }
    }
}
