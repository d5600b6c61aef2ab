#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use deferred_cell::{Deferred, Error, Field, Invoke, Kind, Observer};

    // A little document value standing in for the dynamic payloads this kind
    // of cell usually carries.
    #[derive(Debug, Clone, PartialEq)]
    enum Doc {
        Null,
        Text(String),
        Number(i64),
        Record(Vec<(String, Doc)>),
    }

    fn text(s: &str) -> Doc {
        Doc::Text(s.into())
    }

    impl Field for Doc {
        fn field(&self, name: &str) -> Self {
            match self {
                Doc::Record(fields) => fields
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.clone())
                    .unwrap_or(Doc::Null),
                _ => Doc::Null,
            }
        }
    }

    impl Invoke for Doc {
        fn invoke(&self, method: &str, args: &[Self]) -> Option<Self> {
            match (self, method) {
                (Doc::Text(s), "upper") => Some(Doc::Text(s.to_uppercase())),
                (Doc::Record(_), "pick") => match args {
                    [Doc::Text(name)] => Some(self.field(name)),
                    _ => None,
                },
                _ => None,
            }
        }
    }

    // Hand-rolled event loop: queued closures stand in for timer callbacks.
    type Timers = Rc<RefCell<VecDeque<Box<dyn FnOnce()>>>>;

    fn run_timers(timers: &Timers) {
        loop {
            let next = timers.borrow_mut().pop_front();
            match next {
                Some(timer) => timer(),
                None => break,
            }
        }
    }

    #[test]
    fn test_success_observer_fires_once_and_failure_never() {
        let cell: Deferred<Doc, String> = Deferred::new();
        let successes = Rc::new(RefCell::new(Vec::new()));
        let failures = Rc::new(RefCell::new(0));

        let log = successes.clone();
        let miss = failures.clone();
        cell.observe(
            Some(Observer::direct(move |value: &Doc| {
                log.borrow_mut().push(value.clone());
                None
            })),
            Some(Observer::direct(move |_: &String| {
                *miss.borrow_mut() += 1;
                None
            })),
        );

        let payload = Doc::Record(vec![("a".into(), Doc::Number(1))]);
        cell.resolve(payload.clone()).unwrap();
        assert_eq!(cell.reject("too slow".into()), Err(Error::AlreadySettled));

        assert_eq!(*successes.borrow(), vec![payload]);
        assert_eq!(*failures.borrow(), 0);
    }

    #[test]
    fn test_late_observer_replays_the_settled_value() {
        let cell: Deferred<String, String> = Deferred::new();
        cell.resolve("x".into()).unwrap();

        let seen = Rc::new(RefCell::new(None));
        let slot = seen.clone();
        cell.then(move |value| {
            *slot.borrow_mut() = Some(value.clone());
            None
        });
        assert_eq!(seen.borrow().as_deref(), Some("x"));
    }

    #[test]
    fn test_projection_and_parent_navigation() {
        let cell: Deferred<Doc, String> = Deferred::new();
        let user = cell.get("user");

        let projected = Rc::new(RefCell::new(None));
        let slot = projected.clone();
        user.then(move |value| {
            *slot.borrow_mut() = Some(value.clone());
            None
        });

        let whole = Rc::new(RefCell::new(None));
        let slot = whole.clone();
        user.parent().then(move |value| {
            *slot.borrow_mut() = Some(value.clone());
            None
        });

        let payload = Doc::Record(vec![
            ("user".into(), text("bob")),
            ("id".into(), Doc::Number(7)),
        ]);
        cell.resolve(payload.clone()).unwrap();

        assert_eq!(*projected.borrow(), Some(text("bob")));
        assert_eq!(*whole.borrow(), Some(payload));
    }

    #[test]
    fn test_error_first_adapter() {
        let fulfilled: Deferred<String, String> = Deferred::new();
        fulfilled.settler()(Ok("ok".into())).unwrap();
        assert_eq!(fulfilled.kind(), Some(Kind::Fulfilled));

        let rejected: Deferred<String, String> = Deferred::new();
        let reason = Rc::new(RefCell::new(None));
        let slot = reason.clone();
        rejected.fail(move |error| {
            *slot.borrow_mut() = Some(error.clone());
            None
        });
        rejected.settler()(Err("x".into())).unwrap();
        assert_eq!(reason.borrow().as_deref(), Some("x"));
    }

    #[test]
    fn test_chained_continuables_run_in_order_without_overlap() {
        let timers: Timers = Rc::new(RefCell::new(VecDeque::new()));
        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        let cell: Deferred<i64, String> = Deferred::new();
        for step in 0..2 {
            let timers = timers.clone();
            let log = log.clone();
            cell.on_fulfilled(Observer::continuable(move |value: i64, advance| {
                log.borrow_mut().push(format!("start{step}:{value}"));
                let log = log.clone();
                timers.borrow_mut().push_back(Box::new(move || {
                    log.borrow_mut().push(format!("fire{step}"));
                    advance.advance(value + 1);
                }));
            }));
        }
        let sink = log.clone();
        cell.then(move |value| {
            sink.borrow_mut().push(format!("done:{value}"));
            None
        });

        cell.resolve(1).unwrap();
        // only the first link has started; the chain is suspended on its timer
        assert_eq!(*log.borrow(), vec!["start0:1"]);

        run_timers(&timers);
        assert_eq!(
            *log.borrow(),
            vec!["start0:1", "fire0", "start1:2", "fire1", "done:3"]
        );
    }

    #[test]
    fn test_advance_with_replacement_threads_downstream() {
        let cell: Deferred<String, String> = Deferred::new();
        let stash: Rc<RefCell<Option<deferred_cell::Advance<String>>>> =
            Rc::new(RefCell::new(None));
        let keep = stash.clone();
        cell.on_fulfilled(Observer::continuable(move |_value, advance| {
            *keep.borrow_mut() = Some(advance);
        }));

        let seen = Rc::new(RefCell::new(None));
        let slot = seen.clone();
        cell.then(move |value| {
            *slot.borrow_mut() = Some(value.clone());
            None
        });

        cell.resolve("original".into()).unwrap();
        assert_eq!(*seen.borrow(), None);

        stash.borrow_mut().take().unwrap().advance("replaced".into());
        assert_eq!(seen.borrow().as_deref(), Some("replaced"));
    }

    #[test]
    fn test_method_invocation_on_settled_value() {
        let cell: Deferred<Doc, String> = Deferred::new();
        let seen = Rc::new(RefCell::new(None));
        let slot = seen.clone();
        cell.call("upper", vec![]).then(move |value| {
            *slot.borrow_mut() = Some(value.clone());
            None
        });
        cell.resolve(text("whisper")).unwrap();
        assert_eq!(*seen.borrow(), Some(text("WHISPER")));
    }

    #[test]
    fn test_progress_signals_reach_all_subscribers() {
        let cell: Deferred<i64, String> = Deferred::new();
        let ticks = Rc::new(RefCell::new(Vec::new()));
        for subscriber in 0..2 {
            let ticks = ticks.clone();
            cell.on_progress(move |n| ticks.borrow_mut().push((subscriber, *n)));
        }
        assert!(cell.progress(&10));
        assert!(cell.progress(&20));
        cell.resolve(30).unwrap();
        // settlement does not tear the side channel down
        assert!(cell.progress(&40));
        assert_eq!(
            *ticks.borrow(),
            vec![(0, 10), (1, 10), (0, 20), (1, 20), (0, 40), (1, 40)]
        );
    }

    #[test]
    fn test_version_is_exposed() {
        assert!(!deferred_cell::VERSION.is_empty());
    }
}
