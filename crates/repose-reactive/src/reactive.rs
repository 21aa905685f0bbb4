use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

pub type SignalId = usize;
pub type ObserverId = usize;

const MAX_RERUNS: usize = 100;

thread_local! {
    static CURRENT_OBSERVER: Cell<Option<ObserverId>> = const { Cell::new(None) };
    static GRAPH: RefCell<DepGraph> = RefCell::new(DepGraph::default());
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
    static NEXT_SIGNAL: Cell<SignalId> = const { Cell::new(0) };
}

#[derive(Default)]
struct DepGraph {
    next_observer: ObserverId,
    // signal_id -> observers that depend on it
    edges: HashMap<SignalId, HashSet<ObserverId>>,
    // observer_id -> signals it depends on
    back: HashMap<ObserverId, HashSet<SignalId>>,
    // recompute closures
    observers: HashMap<ObserverId, Rc<dyn Fn()>>,
    running: HashSet<ObserverId>,
    // notified while running; re-run once the current run returns
    dirty: HashSet<ObserverId>,
}

#[derive(Default)]
struct BatchState {
    depth: usize,
    pending: Vec<SignalId>,
}

impl DepGraph {
    fn remove_all_edges_for(&mut self, obs: ObserverId) {
        if let Some(signals) = self.back.remove(&obs) {
            for s in signals {
                if let Some(set) = self.edges.get_mut(&s) {
                    set.remove(&obs);
                }
            }
        }
    }

    fn remove_observer(&mut self, obs: ObserverId) -> Option<Rc<dyn Fn()>> {
        self.remove_all_edges_for(obs);
        self.running.remove(&obs);
        self.dirty.remove(&obs);
        self.observers.remove(&obs)
    }

    fn forget_signal(&mut self, sig: SignalId) {
        if let Some(observers) = self.edges.remove(&sig) {
            for obs in observers {
                if let Some(set) = self.back.get_mut(&obs) {
                    set.remove(&sig);
                }
            }
        }
    }
}

/// Restores the previous observer on drop, also during unwinding.
struct ObserverGuard(Option<ObserverId>);

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        CURRENT_OBSERVER.with(|co| co.set(self.0));
    }
}

fn enter_observer(obs: Option<ObserverId>) -> ObserverGuard {
    ObserverGuard(CURRENT_OBSERVER.with(|co| co.replace(obs)))
}

pub(crate) fn next_signal_id() -> SignalId {
    NEXT_SIGNAL.with(|n| {
        let id = n.get();
        n.set(id + 1);
        id
    })
}

/// Drops every edge that points at a signal which no longer exists.
pub(crate) fn forget_signal(sig: SignalId) {
    let _ = GRAPH.try_with(|g| {
        if let Ok(mut g) = g.try_borrow_mut() {
            g.forget_signal(sig);
        }
    });
}

/// Returns the observer whose reads are currently being recorded, if any.
pub fn current_observer() -> Option<ObserverId> {
    CURRENT_OBSERVER.with(|co| co.get())
}

pub fn register_signal_read(sig: SignalId) {
    if let Some(obs) = current_observer() {
        GRAPH.with(|g| {
            let mut g = g.borrow_mut();
            // a removed observer may still be finishing its last run
            if !g.observers.contains_key(&obs) {
                return;
            }
            g.edges.entry(sig).or_default().insert(obs);
            g.back.entry(obs).or_default().insert(sig);
        });
    }
}

/// Re-runs every observer that read `sig` during its last run.
///
/// Inside [`batch`] the notification is queued and delivered when the
/// outermost batch returns.
pub fn signal_changed(sig: SignalId) {
    let deferred = BATCH.with(|b| {
        let mut b = b.borrow_mut();
        if b.depth == 0 {
            return false;
        }
        if !b.pending.contains(&sig) {
            b.pending.push(sig);
        }
        true
    });
    if deferred {
        return;
    }

    rerun_dependents(&[sig]);
}

/// Runs each observer depending on any of `sigs` once.
fn rerun_dependents(sigs: &[SignalId]) {
    let mut queue: Vec<ObserverId> = GRAPH.with(|g| {
        let g = g.borrow();
        let mut queue = Vec::new();
        for sig in sigs {
            if let Some(set) = g.edges.get(sig) {
                queue.extend(set.iter().copied());
            }
        }
        queue
    });
    // creation order, so outer observers run before the ones they created
    queue.sort_unstable();
    queue.dedup();
    for obs in queue {
        run_observer_now(obs);
    }
}

pub fn new_observer(f: impl Fn() + 'static) -> ObserverId {
    GRAPH.with(|g| {
        let mut g = g.borrow_mut();
        let id = g.next_observer;
        g.next_observer += 1;
        g.observers.insert(id, Rc::new(f));
        id
    })
}

/// Remove an observer and all of its dependency edges.
pub fn remove_observer(id: ObserverId) {
    // the closure may own signals, so drop it after the graph is released
    let removed = GRAPH.with(|g| g.borrow_mut().remove_observer(id));
    drop(removed);
}

/// Runs observer `id`, re-recording its dependencies.
///
/// An observer notified while it is already running is not re-entered; it
/// is marked dirty and runs again as soon as the current run returns, until
/// a run completes without being notified.
pub fn run_observer_now(id: ObserverId) {
    let f = GRAPH.with(|g| {
        let mut g = g.borrow_mut();
        if g.running.contains(&id) {
            g.dirty.insert(id);
            return None;
        }
        let f = g.observers.get(&id).cloned()?;
        g.running.insert(id);
        Some(f)
    });
    let Some(f) = f else {
        return;
    };

    struct Running(ObserverId);
    impl Drop for Running {
        fn drop(&mut self) {
            let _ = GRAPH.try_with(|g| {
                if let Ok(mut g) = g.try_borrow_mut() {
                    g.running.remove(&self.0);
                    g.dirty.remove(&self.0);
                }
            });
        }
    }

    let _running = Running(id);
    let _guard = enter_observer(Some(id));
    for _ in 0..MAX_RERUNS {
        GRAPH.with(|g| g.borrow_mut().remove_all_edges_for(id));
        f();
        let again = GRAPH.with(|g| {
            let mut g = g.borrow_mut();
            g.dirty.remove(&id) && g.observers.contains_key(&id)
        });
        if !again {
            return;
        }
    }
    log::error!("observer {id} still dirty after {MAX_RERUNS} consecutive runs; giving up");
}

/// Runs `f` as observer `id`, recording its reads as that observer's
/// dependencies, without invoking the observer's own closure.
pub fn run_as_observer<R>(id: ObserverId, f: impl FnOnce() -> R) -> R {
    GRAPH.with(|g| g.borrow_mut().remove_all_edges_for(id));
    let _guard = enter_observer(Some(id));
    f()
}

/// Runs `f` without recording any reads.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _guard = enter_observer(None);
    f()
}

/// Groups writes so that dependents re-run once, after `f` returns.
///
/// Nested batches flush only when the outermost one completes. A signal
/// changed several times inside a batch is delivered once.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    struct Depth;
    impl Drop for Depth {
        fn drop(&mut self) {
            BATCH.with(|b| {
                let mut b = b.borrow_mut();
                b.depth -= 1;
                if b.depth == 0 && std::thread::panicking() {
                    b.pending.clear();
                }
            });
        }
    }

    BATCH.with(|b| b.borrow_mut().depth += 1);
    let out = {
        let _depth = Depth;
        f()
    };
    if BATCH.with(|b| b.borrow().depth == 0) {
        flush_pending();
    }
    out
}

fn flush_pending() {
    loop {
        let pending = BATCH.with(|b| std::mem::take(&mut b.borrow_mut().pending));
        if pending.is_empty() {
            break;
        }
        log::trace!("flushing {} batched signal(s)", pending.len());
        rerun_dependents(&pending);
    }
}

/// Returns whether a batch is currently open.
pub fn is_batching() -> bool {
    BATCH.with(|b| b.borrow().depth > 0)
}
