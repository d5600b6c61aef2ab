use std::fmt;

/// An observer registered against one settlement kind.
///
/// The shape of an observer is declared by the caller at registration time,
/// not inferred from the callback: a [`Direct`](Observer::Direct) observer
/// runs inline and may replace the carried value by returning `Some`, while a
/// [`Continuable`](Observer::Continuable) observer takes the carried value
/// together with an [`Advance`] handle and suspends the chain until the
/// handle is called. Shapes outside these two are unrepresentable.
pub enum Observer<V> {
    /// Runs inline with a borrow of the carried value. A `Some` return
    /// overwrites the carried value for the rest of the chain.
    Direct(Box<dyn FnOnce(&V) -> Option<V>>),
    /// Takes ownership of the carried value and an [`Advance`] handle. The
    /// chain stays suspended until [`Advance::advance`] is called.
    Continuable(Box<dyn FnOnce(V, Advance<V>)>),
}

impl<V> Observer<V> {
    /// Wrap an inline observer.
    ///
    /// ```
    /// use deferred_cell::{Deferred, Observer};
    ///
    /// let cell: Deferred<i32, String> = Deferred::new();
    /// cell.on_fulfilled(Observer::direct(|n| Some(n * 2)));
    /// cell.then(|n| {
    ///     assert_eq!(*n, 14);
    ///     None
    /// });
    /// cell.resolve(7).unwrap();
    /// ```
    pub fn direct(f: impl FnOnce(&V) -> Option<V> + 'static) -> Self {
        Observer::Direct(Box::new(f))
    }

    /// Wrap a suspending observer.
    pub fn continuable(f: impl FnOnce(V, Advance<V>) + 'static) -> Self {
        Observer::Continuable(Box::new(f))
    }
}

impl<V> fmt::Debug for Observer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observer::Direct(_) => f.write_str("Observer::Direct"),
            Observer::Continuable(_) => f.write_str("Observer::Continuable"),
        }
    }
}

/// Resume handle handed to a continuable observer.
///
/// Calling [`advance`](Advance::advance) hands the carried value back to the
/// traversal engine and drains the rest of the queue; pass the value you
/// received to keep it, or a different one to replace it. Dropping the handle
/// without calling it stalls the remainder of the chain permanently.
pub struct Advance<V> {
    resume: Box<dyn FnOnce(V)>,
}

impl<V> Advance<V> {
    pub(crate) fn new(resume: impl FnOnce(V) + 'static) -> Self {
        Advance {
            resume: Box::new(resume),
        }
    }

    /// Resume the suspended chain with `value` as the carried value.
    pub fn advance(self, value: V) {
        (self.resume)(value)
    }
}

impl<V> fmt::Debug for Advance<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Advance")
    }
}
