#[cfg(test)]
mod tests {
    use crate::context::*;
    use crate::effects::*;
    use crate::memo::*;
    use crate::owner::*;
    use crate::reactive::*;
    use crate::signal::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn test_signal_basic() {
        let sig = signal(42);
        assert_eq!(sig.get(), 42);

        sig.set(100);
        assert_eq!(sig.get(), 100);

        sig.update(|v| *v += 1);
        assert_eq!(sig.get(), 101);
    }

    #[test]
    fn test_signal_subscription() {
        let sig = signal(0);
        let called = Rc::new(RefCell::new(false));

        let called_clone = called.clone();
        sig.subscribe(move |_| {
            *called_clone.borrow_mut() = true;
        });

        sig.set(42);
        assert!(*called.borrow());
    }

    #[test]
    fn test_signal_unsubscribe() {
        let sig = signal(0);
        let calls = Rc::new(Cell::new(0));

        let id = sig.subscribe({
            let calls = calls.clone();
            move |_| calls.set(calls.get() + 1)
        });
        sig.set(1);
        assert!(sig.unsubscribe(id));
        assert!(!sig.unsubscribe(id));
        sig.set(2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_write_during_own_run_reruns() {
        let sig = signal(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let _d = effect({
            let sig = sig.clone();
            let seen = seen.clone();
            move || {
                let v = sig.get();
                seen.borrow_mut().push(v);
                if v == 0 {
                    sig.set(1);
                }
            }
        });

        assert_eq!(*seen.borrow(), vec![0, 1]);
        sig.set(5);
        assert_eq!(*seen.borrow(), vec![0, 1, 5]);
    }

    #[test]
    fn test_effect_rerun_disposes_previous_run() {
        let sig = signal(0);
        let tick = signal(0);
        let cleanups = Rc::new(Cell::new(0));
        let inner_runs = Rc::new(Cell::new(0));
        let root = Owner::new();

        root.run(|| {
            let sig = sig.clone();
            let tick = tick.clone();
            let cleanups = cleanups.clone();
            let inner_runs = inner_runs.clone();
            effect(move || {
                sig.get();
                on_cleanup({
                    let cleanups = cleanups.clone();
                    move || cleanups.set(cleanups.get() + 1)
                });
                effect({
                    let tick = tick.clone();
                    let inner_runs = inner_runs.clone();
                    move || {
                        tick.get();
                        inner_runs.set(inner_runs.get() + 1);
                    }
                });
            });
        });

        for i in 1..=3 {
            sig.set(i);
        }
        assert_eq!(cleanups.get(), 3);
        assert_eq!(inner_runs.get(), 4);

        // only the inner effect of the live run is still subscribed
        tick.set(1);
        assert_eq!(inner_runs.get(), 5);

        root.dispose();
        assert_eq!(cleanups.get(), 4);
        tick.set(2);
        assert_eq!(inner_runs.get(), 5);
    }

    #[test]
    fn test_effect_dispose_tears_down_last_run() {
        let cleaned = Rc::new(Cell::new(false));
        let d = effect({
            let cleaned = cleaned.clone();
            move || {
                let cleaned = cleaned.clone();
                on_cleanup(move || cleaned.set(true));
            }
        });

        assert!(!cleaned.get());
        d.run();
        assert!(cleaned.get());
    }

    #[test]
    fn test_effect_tracks_reads() {
        let sig = signal(1);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let _d = effect({
            let sig = sig.clone();
            let seen = seen.clone();
            move || seen.borrow_mut().push(sig.get())
        });

        sig.set(2);
        sig.set(3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_untracked_read_does_not_subscribe() {
        let sig = signal(1);
        let runs = Rc::new(Cell::new(0));

        let _d = effect({
            let sig = sig.clone();
            let runs = runs.clone();
            move || {
                let _ = sig.get_untracked();
                let _ = untrack(|| sig.get());
                runs.set(runs.get() + 1);
            }
        });

        sig.set(2);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_equals_override() {
        let same = Signal::with_equals(1, |a: &i32, b: &i32| a == b);
        let always = Signal::with_equals((), |_: &(), _: &()| false);
        let runs = Rc::new(Cell::new(0));

        let _d = effect({
            let same = same.clone();
            let always = always.clone();
            let runs = runs.clone();
            move || {
                same.get();
                always.get();
                runs.set(runs.get() + 1);
            }
        });

        same.set(1);
        assert_eq!(runs.get(), 1);
        same.set(2);
        assert_eq!(runs.get(), 2);
        always.set(());
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn test_notify_without_write() {
        let sig = signal(vec![1, 2]);
        let runs = Rc::new(Cell::new(0));

        let _d = effect({
            let sig = sig.clone();
            let runs = runs.clone();
            move || {
                sig.with(|_| ());
                runs.set(runs.get() + 1);
            }
        });

        sig.notify();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_batch_delivers_once() {
        let a = signal(0);
        let b = signal(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let _d = effect({
            let a = a.clone();
            let b = b.clone();
            let seen = seen.clone();
            move || seen.borrow_mut().push((a.get(), b.get()))
        });

        batch(|| {
            a.set(1);
            b.set(1);
            batch(|| a.set(2));
            assert!(is_batching());
        });

        assert!(!is_batching());
        assert_eq!(*seen.borrow(), vec![(0, 0), (2, 1)]);
    }

    #[test]
    fn test_dispose_stops_effect() {
        let sig = signal(0);
        let runs = Rc::new(Cell::new(0));

        let d = effect({
            let sig = sig.clone();
            let runs = runs.clone();
            move || {
                sig.get();
                runs.set(runs.get() + 1);
            }
        });

        d.run();
        assert!(d.is_done());
        sig.set(1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_memo_skips_equal_values() {
        let n = signal(1);
        let parity = memo({
            let n = n.clone();
            move || n.get() % 2
        });
        let runs = Rc::new(Cell::new(0));

        let _d = effect({
            let parity = parity.clone();
            let runs = runs.clone();
            move || {
                parity.get();
                runs.set(runs.get() + 1);
            }
        });

        n.set(3);
        assert_eq!(runs.get(), 1);
        n.set(4);
        assert_eq!(runs.get(), 2);
        assert_eq!(parity.get(), 0);
    }

    #[test]
    fn test_owner_explicit_dispose() {
        let cleaned_up = Rc::new(RefCell::new(false));

        let owner = Owner::new();
        let cleaned_up_clone = cleaned_up.clone();
        owner.add_disposer(move || {
            *cleaned_up_clone.borrow_mut() = true;
        });

        assert!(!*cleaned_up.borrow());
        owner.dispose();
        assert!(*cleaned_up.borrow());
    }

    #[test]
    fn test_owner_disposes_children_first_and_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let root = Owner::new();

        let child = root.run(|| {
            let l = log.clone();
            on_cleanup(move || l.borrow_mut().push("root"));
            let child = Owner::child_of_current();
            child.run(|| {
                let l = log.clone();
                on_cleanup(move || l.borrow_mut().push("child"));
                let grandchild = Owner::child_of_current();
                let l = log.clone();
                grandchild.add_disposer(move || l.borrow_mut().push("grandchild"));
            });
            child
        });

        root.dispose();
        child.dispose();
        root.dispose();
        assert_eq!(*log.borrow(), vec!["grandchild", "child", "root"]);
        assert!(child.is_disposed());
    }

    #[test]
    fn test_disposed_child_detaches() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let root = Owner::new();
        let child = root.child();
        let l = log.clone();
        child.add_disposer(move || l.borrow_mut().push("child"));

        child.dispose();
        root.dispose();
        assert_eq!(*log.borrow(), vec!["child"]);
    }

    #[test]
    fn test_context_shadowing() {
        let key = ContextId::new();
        let other = ContextId::new();
        let root = Owner::new();

        root.run(|| {
            assert_eq!(use_context::<&str>(key), None);
            provide_context(key, "outer");
            let inner = Owner::child_of_current();
            inner.run(|| {
                provide_context(key, "inner");
                assert_eq!(use_context::<&str>(key), Some("inner"));
                assert_eq!(use_context::<&str>(other), None);
            });
            assert_eq!(use_context::<&str>(key), Some("outer"));
        });
    }

    #[test]
    fn test_context_snapshot_reenters() {
        let key = ContextId::new();
        let root = Owner::new();
        let snap = root.run(|| {
            provide_context(key, 7u8);
            ContextSnapshot::capture()
        });

        assert!(!snap.is_empty());
        assert!(ContextSnapshot::capture().is_empty());
        assert_eq!(use_context::<u8>(key), None);
        assert_eq!(snap.run(|| use_context::<u8>(key)), Some(7));
    }

    #[test]
    fn test_context_snapshot_children_live_with_current_owner() {
        let key = ContextId::new();
        let snap = Owner::new().run(|| {
            provide_context(key, 1u8);
            ContextSnapshot::capture()
        });
        let cleaned = Rc::new(Cell::new(false));
        let host = Owner::new();

        host.run(|| {
            snap.run(|| {
                assert_eq!(use_context::<u8>(key), Some(1));
                let cleaned = cleaned.clone();
                on_cleanup(move || cleaned.set(true));
            });
        });
        assert!(!cleaned.get());

        host.dispose();
        assert!(cleaned.get());
    }

    #[test]
    fn test_effect_reruns_under_its_owner() {
        let key = ContextId::new();
        let sig = signal(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let root = Owner::new();

        root.run(|| {
            provide_context(key, "scoped");
            let sig = sig.clone();
            let seen = seen.clone();
            effect(move || {
                sig.get();
                seen.borrow_mut().push(use_context::<&str>(key));
            });
        });

        sig.set(1);
        assert_eq!(*seen.borrow(), vec![Some("scoped"), Some("scoped")]);
    }
}
