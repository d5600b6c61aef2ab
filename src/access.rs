use crate::cell::Deferred;
use crate::observer::Observer;

/// Field projection on an eventually-settled value, used by
/// [`Deferred::get`].
///
/// `field` is total: how a missing member is represented (a null variant, a
/// default, a panic) is the implementing type's business.
pub trait Field: Sized {
    fn field(&self, name: &str) -> Self;
}

/// Named-method dispatch on an eventually-settled value, used by
/// [`Deferred::call`]. The receiver is the settled value itself, so an
/// implementation can read sibling fields. Returning `Some` replaces the
/// carried value for the rest of the chain.
pub trait Invoke: Sized {
    fn invoke(&self, method: &str, args: &[Self]) -> Option<Self>;
}

impl<T: Field + 'static, E: Clone + 'static> Deferred<T, E> {
    /// Project one field of the eventual value into a new child cell.
    ///
    /// The child fulfills with `value.field(name)` when this cell fulfills
    /// and inherits the rejection reason unchanged when it rejects. The
    /// returned handle chains against the projected field; step back up with
    /// [`parent`](Deferred::parent).
    pub fn get(&self, name: &str) -> Deferred<T, E> {
        let child = self.child_of();
        let name = name.to_owned();
        let on_value = {
            let child = child.clone();
            Observer::direct(move |value: &T| {
                let _ = child.resolve(value.field(&name));
                None
            })
        };
        let on_error = {
            let child = child.clone();
            Observer::direct(move |error: &E| {
                let _ = child.reject(error.clone());
                None
            })
        };
        self.observe(Some(on_value), Some(on_error));
        child
    }
}

impl<T: Invoke + 'static, E: 'static> Deferred<T, E> {
    /// Invoke a named method on the eventual value with an argument list
    /// fixed at registration time. A `Some` result replaces the carried
    /// value for downstream observers. Chains on the same cell.
    pub fn call(&self, method: &str, args: Vec<T>) -> Deferred<T, E> {
        let method = method.to_owned();
        self.then(move |value| value.invoke(&method, &args))
    }
}
