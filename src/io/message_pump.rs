//=========================================================================
// Message Pump
//=========================================================================
//
// Single-threaded cooperative dispatcher between event sources and
// listeners.
//
// Architecture:
//   PumpSource::poll(sink) ──→ post()           ──→ queue ──┐
//                         └──→ post_immediate() ──────────┐ │
//                                                         ↓ ↓
//                                   Listener::on_immediate / on_event
//
// One tick (`pump()`):
//   1. Poll every source in registration order
//   2. Drain the queue FIFO to completion, including events posted
//      by listeners during the drain
//
// Registration tables hold weak references. The pump never keeps a
// source or listener alive; dropped entries are pruned at the start of
// each tick. While a tick is running the pump is mutably borrowed, so a
// listener can only reach it through the `EventSink` it is handed and
// cannot touch the registration tables.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use log::{debug, error, trace, warn};

//=== Internal Dependencies ===============================================

use super::event::Event;

//=== Capability Traits ===================================================

/// Write end of the pump handed to sources and listeners.
pub trait EventSink {
    /// Queues an event for delivery later in the current (or next) tick.
    fn post(&mut self, event: Event);

    /// Delivers an event to every listener without entering the queue.
    fn post_immediate(&mut self, event: Event);
}

/// Consumer of pumped events.
pub trait Listener {
    /// Called for every queued event.
    fn on_event(&mut self, event: &Event, sink: &mut dyn EventSink);

    /// Called for every immediate event. Forwards to `on_event` unless
    /// overridden.
    fn on_immediate(&mut self, event: &Event, sink: &mut dyn EventSink) {
        self.on_event(event, sink);
    }
}

/// Result of polling a source once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The source may produce more events on later ticks.
    Ready,
    /// The source has nothing more to say. It stays registered.
    EndOfStream,
}

/// Producer of events, polled once per tick.
///
/// `poll` must return in bounded time and tolerate being called when
/// there is nothing to report.
pub trait PumpSource {
    fn poll(&mut self, sink: &mut dyn EventSink) -> PollStatus;
}

//=== Type Aliases ========================================================

type SourceRef = Rc<RefCell<dyn PumpSource>>;
type ListenerRef = Rc<RefCell<dyn Listener>>;

//=== MessagePump =========================================================

/// Dispatcher owning the registration tables and the event queue.
pub struct MessagePump {
    sources: Vec<Weak<RefCell<dyn PumpSource>>>,
    listeners: Vec<Weak<RefCell<dyn Listener>>>,
    queue: VecDeque<Event>,
}

impl MessagePump {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            listeners: Vec::new(),
            queue: VecDeque::with_capacity(64),
        }
    }

    //--- Registration -----------------------------------------------------

    /// Appends a source to the poll order.
    ///
    /// # Panics
    /// If the same source is already registered.
    pub fn register_source<S: PumpSource + 'static>(&mut self, source: &Rc<RefCell<S>>) {
        let key = identity(source);
        assert!(
            !self.sources.iter().any(|s| weak_identity(s) == key),
            "source {:p} is already registered",
            key
        );

        let source: SourceRef = source.clone();
        self.sources.push(Rc::downgrade(&source));
        debug!(target: "pump", "Registered source {:p} ({} total)", key, self.sources.len());
    }

    /// Removes a source. Unknown sources are ignored.
    pub fn unregister_source<S: PumpSource + 'static>(&mut self, source: &Rc<RefCell<S>>) {
        let key = identity(source);
        if let Some(index) = self.sources.iter().position(|s| weak_identity(s) == key) {
            self.sources.remove(index);
            debug!(target: "pump", "Unregistered source {:p}", key);
        }
    }

    /// Appends a listener to the delivery order.
    ///
    /// # Panics
    /// If the same listener is already registered.
    pub fn register_listener<L: Listener + 'static>(&mut self, listener: &Rc<RefCell<L>>) {
        let key = identity(listener);
        assert!(
            !self.listeners.iter().any(|l| weak_identity(l) == key),
            "listener {:p} is already registered",
            key
        );

        let listener: ListenerRef = listener.clone();
        self.listeners.push(Rc::downgrade(&listener));
        debug!(target: "pump", "Registered listener {:p} ({} total)", key, self.listeners.len());
    }

    /// Removes a listener. Unknown listeners are ignored.
    pub fn unregister_listener<L: Listener + 'static>(&mut self, listener: &Rc<RefCell<L>>) {
        let key = identity(listener);
        if let Some(index) = self.listeners.iter().position(|l| weak_identity(l) == key) {
            self.listeners.remove(index);
            debug!(target: "pump", "Unregistered listener {:p}", key);
        }
    }

    //--- Posting ----------------------------------------------------------

    /// Queues an event for the next `pump()`.
    pub fn post(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    /// Delivers an event to every live listener right now.
    ///
    /// Events the listeners queue in response stay queued until the next
    /// `pump()`.
    pub fn post_immediate(&mut self, event: Event) {
        let listeners = upgrade_all(&self.listeners);
        let mut dispatch = Dispatch::new(&listeners, &mut self.queue);
        dispatch.deliver(&event, Delivery::Immediate);
        dispatch.flush_deferred();
    }

    //--- Tick -------------------------------------------------------------

    /// Runs one tick: polls all sources, then drains the queue.
    pub fn pump(&mut self) {
        self.prune();

        let sources = upgrade_all(&self.sources);
        let listeners = upgrade_all(&self.listeners);
        let mut dispatch = Dispatch::new(&listeners, &mut self.queue);

        for source in &sources {
            dispatch.poll_source(source);
        }

        let mut delivered = 0usize;
        while let Some(event) = dispatch.queue.pop_front() {
            dispatch.deliver(&event, Delivery::Queued);
            delivered += 1;
        }

        if delivered > 0 {
            trace!(target: "pump", "Tick delivered {} queued events", delivered);
        }
    }

    //--- Query API --------------------------------------------------------

    /// Number of registered sources that are still alive.
    pub fn source_count(&self) -> usize {
        self.sources.iter().filter(|s| s.strong_count() > 0).count()
    }

    /// Number of registered listeners that are still alive.
    pub fn listener_count(&self) -> usize {
        self.listeners.iter().filter(|l| l.strong_count() > 0).count()
    }

    /// Number of events waiting for the next tick.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn has_listener<L: Listener + 'static>(&self, listener: &Rc<RefCell<L>>) -> bool {
        let key = identity(listener);
        self.listeners.iter().any(|l| weak_identity(l) == key)
    }

    pub fn has_source<S: PumpSource + 'static>(&self, source: &Rc<RefCell<S>>) -> bool {
        let key = identity(source);
        self.sources.iter().any(|s| weak_identity(s) == key)
    }

    //--- Internal ---------------------------------------------------------

    fn prune(&mut self) {
        let sources = self.sources.len();
        let listeners = self.listeners.len();

        self.sources.retain(|s| s.strong_count() > 0);
        self.listeners.retain(|l| l.strong_count() > 0);

        let dropped = (sources - self.sources.len()) + (listeners - self.listeners.len());
        if dropped > 0 {
            debug!(target: "pump", "Pruned {} dropped registrations", dropped);
        }
    }
}

impl Default for MessagePump {
    fn default() -> Self {
        Self::new()
    }
}

//=== Dispatch ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Queued,
    Immediate,
}

/// Sink handed to sources and listeners for the duration of one tick.
///
/// Immediate events raised while a callback is running are held back
/// until that callback returns, so the caller receives them as well.
/// Held-back events are flushed in posting order, each one reaching every
/// listener before the next starts.
struct Dispatch<'a> {
    listeners: &'a [ListenerRef],
    queue: &'a mut VecDeque<Event>,
    depth: usize,
    deferred: VecDeque<Event>,
    flushing: bool,
}

impl<'a> Dispatch<'a> {
    fn new(listeners: &'a [ListenerRef], queue: &'a mut VecDeque<Event>) -> Self {
        Self {
            listeners,
            queue,
            depth: 0,
            deferred: VecDeque::new(),
            flushing: false,
        }
    }

    fn poll_source(&mut self, source: &SourceRef) {
        let mut guard = match source.try_borrow_mut() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(target: "pump", "Source {:p} is busy; skipped this tick", Rc::as_ptr(source));
                return;
            }
        };

        self.depth += 1;
        let status = guard.poll(&mut *self);
        self.depth -= 1;
        drop(guard);

        if status == PollStatus::EndOfStream {
            trace!(target: "pump", "Source {:p} reported end of stream", Rc::as_ptr(source));
        }

        self.flush_deferred();
    }

    fn deliver(&mut self, event: &Event, delivery: Delivery) {
        let listeners = self.listeners;

        for listener in listeners {
            let mut guard = match listener.try_borrow_mut() {
                Ok(guard) => guard,
                Err(_) => {
                    warn!(
                        target: "pump",
                        "Listener {:p} is already borrowed; {:?} not delivered to it",
                        Rc::as_ptr(listener),
                        event.kind()
                    );
                    continue;
                }
            };

            self.depth += 1;
            let result = panic::catch_unwind(AssertUnwindSafe(|| match delivery {
                Delivery::Queued => guard.on_event(event, &mut *self),
                Delivery::Immediate => guard.on_immediate(event, &mut *self),
            }));
            self.depth -= 1;
            drop(guard);

            if let Err(payload) = result {
                error!(
                    target: "pump",
                    "Listener {:p} panicked handling {:?}: {}",
                    Rc::as_ptr(listener),
                    event.kind(),
                    describe_panic(payload.as_ref())
                );
            }

            self.flush_deferred();
        }
    }

    fn flush_deferred(&mut self) {
        // An outer flush already owns the deferred queue.
        if self.depth > 0 || self.flushing {
            return;
        }
        self.flushing = true;
        while let Some(event) = self.deferred.pop_front() {
            self.deliver(&event, Delivery::Immediate);
        }
        self.flushing = false;
    }
}

impl EventSink for Dispatch<'_> {
    fn post(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    fn post_immediate(&mut self, event: Event) {
        if self.depth > 0 {
            self.deferred.push_back(event);
        } else {
            self.deliver(&event, Delivery::Immediate);
            self.flush_deferred();
        }
    }
}

//=== Helpers =============================================================

fn identity<T: ?Sized>(rc: &Rc<T>) -> *const () {
    Rc::as_ptr(rc) as *const ()
}

fn weak_identity<T: ?Sized>(weak: &Weak<T>) -> *const () {
    Weak::as_ptr(weak) as *const ()
}

fn upgrade_all<T: ?Sized>(table: &[Weak<T>]) -> Vec<Rc<T>> {
    table.iter().filter_map(Weak::upgrade).collect()
}

fn describe_panic(payload: &(dyn Any + Send + 'static)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::event::{UserEvent, WindowClose, WindowId, USER_EVENT_BASE};

    fn user(tag: u16) -> Event {
        Event::from(UserEvent::new(USER_EVENT_BASE + tag, Vec::<u8>::new()))
    }

    fn tag(event: &Event) -> u16 {
        event.id() - USER_EVENT_BASE
    }

    //--- Test doubles -----------------------------------------------------

    /// Records (immediate?, tag) pairs and optionally reacts to one tag.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<(bool, u16)>,
        on_tag: Option<(u16, Reaction)>,
    }

    #[derive(Clone, Copy)]
    enum Reaction {
        Post(u16),
        PostImmediateThenPost(u16, u16),
        PostImmediateTwice(u16, u16),
        Panic,
    }

    impl Recorder {
        fn reacting(tag: u16, reaction: Reaction) -> Self {
            Self {
                seen: Vec::new(),
                on_tag: Some((tag, reaction)),
            }
        }

        fn tags(&self) -> Vec<u16> {
            self.seen.iter().map(|(_, t)| *t).collect()
        }

        fn react(&mut self, event: &Event, sink: &mut dyn EventSink) {
            if let Some((trigger, reaction)) = self.on_tag {
                if tag(event) == trigger {
                    match reaction {
                        Reaction::Post(t) => sink.post(user(t)),
                        Reaction::PostImmediateThenPost(i, q) => {
                            sink.post_immediate(user(i));
                            sink.post(user(q));
                        }
                        Reaction::PostImmediateTwice(first, second) => {
                            sink.post_immediate(user(first));
                            sink.post_immediate(user(second));
                        }
                        Reaction::Panic => panic!("listener failure"),
                    }
                }
            }
        }
    }

    impl Listener for Recorder {
        fn on_event(&mut self, event: &Event, sink: &mut dyn EventSink) {
            self.seen.push((false, tag(event)));
            self.react(event, sink);
        }

        fn on_immediate(&mut self, event: &Event, sink: &mut dyn EventSink) {
            self.seen.push((true, tag(event)));
            self.react(event, sink);
        }
    }

    /// Emits a fixed script of (immediate?, tag) per poll.
    struct Scripted {
        script: Vec<(bool, u16)>,
        polls: usize,
        status: PollStatus,
    }

    impl Scripted {
        fn new(script: Vec<(bool, u16)>) -> Self {
            Self {
                script,
                polls: 0,
                status: PollStatus::Ready,
            }
        }
    }

    impl PumpSource for Scripted {
        fn poll(&mut self, sink: &mut dyn EventSink) -> PollStatus {
            self.polls += 1;
            for &(immediate, t) in &self.script {
                if immediate {
                    sink.post_immediate(user(t));
                } else {
                    sink.post(user(t));
                }
            }
            self.status
        }
    }

    //--- Ordering ---------------------------------------------------------

    #[test]
    fn events_posted_during_drain_arrive_in_posting_order() {
        let mut pump = MessagePump::new();
        let listener = Rc::new(RefCell::new(Recorder::reacting(1, Reaction::Post(3))));
        pump.register_listener(&listener);

        pump.post(user(1));
        pump.post(user(2));
        pump.pump();

        assert_eq!(listener.borrow().tags(), vec![1, 2, 3]);
        assert_eq!(pump.queued(), 0);
    }

    #[test]
    fn sources_are_polled_in_registration_order() {
        let mut pump = MessagePump::new();
        let first = Rc::new(RefCell::new(Scripted::new(vec![(false, 1), (false, 2)])));
        let second = Rc::new(RefCell::new(Scripted::new(vec![(false, 3)])));
        let listener = Rc::new(RefCell::new(Recorder::default()));

        pump.register_source(&first);
        pump.register_source(&second);
        pump.register_listener(&listener);
        pump.pump();

        assert_eq!(listener.borrow().tags(), vec![1, 2, 3]);
    }

    #[test]
    fn every_listener_sees_every_event() {
        let mut pump = MessagePump::new();
        let a = Rc::new(RefCell::new(Recorder::default()));
        let b = Rc::new(RefCell::new(Recorder::default()));
        pump.register_listener(&a);
        pump.register_listener(&b);

        pump.post(user(1));
        pump.post(user(2));
        pump.pump();

        assert_eq!(a.borrow().tags(), vec![1, 2]);
        assert_eq!(b.borrow().tags(), vec![1, 2]);
    }

    //--- Immediate delivery ----------------------------------------------

    #[test]
    fn immediate_from_source_precedes_its_queued_events() {
        let mut pump = MessagePump::new();
        let source = Rc::new(RefCell::new(Scripted::new(vec![(false, 1), (true, 2), (false, 3)])));
        let listener = Rc::new(RefCell::new(Recorder::default()));
        pump.register_source(&source);
        pump.register_listener(&listener);

        pump.pump();

        assert_eq!(listener.borrow().seen, vec![(true, 2), (false, 1), (false, 3)]);
    }

    #[test]
    fn immediate_from_listener_precedes_later_queued_events() {
        let mut pump = MessagePump::new();
        let reactor = Rc::new(RefCell::new(Recorder::reacting(
            1,
            Reaction::PostImmediateThenPost(2, 3),
        )));
        let observer = Rc::new(RefCell::new(Recorder::default()));
        pump.register_listener(&reactor);
        pump.register_listener(&observer);

        pump.post(user(1));
        pump.pump();

        assert_eq!(reactor.borrow().seen, vec![(false, 1), (true, 2), (false, 3)]);
        assert_eq!(observer.borrow().seen, vec![(true, 2), (false, 1), (false, 3)]);
    }

    #[test]
    fn immediates_from_source_keep_order_for_every_listener() {
        let mut pump = MessagePump::new();
        let source = Rc::new(RefCell::new(Scripted::new(vec![(true, 1), (true, 2)])));
        let a = Rc::new(RefCell::new(Recorder::default()));
        let b = Rc::new(RefCell::new(Recorder::default()));
        let c = Rc::new(RefCell::new(Recorder::default()));
        pump.register_source(&source);
        pump.register_listener(&a);
        pump.register_listener(&b);
        pump.register_listener(&c);

        pump.pump();

        for listener in [&a, &b, &c] {
            assert_eq!(listener.borrow().seen, vec![(true, 1), (true, 2)]);
        }
    }

    #[test]
    fn immediates_from_one_callback_keep_order_for_every_listener() {
        let mut pump = MessagePump::new();
        let reactor = Rc::new(RefCell::new(Recorder::reacting(
            1,
            Reaction::PostImmediateTwice(2, 3),
        )));
        let observer = Rc::new(RefCell::new(Recorder::default()));
        pump.register_listener(&reactor);
        pump.register_listener(&observer);

        pump.post(user(1));
        pump.pump();

        assert_eq!(reactor.borrow().seen, vec![(false, 1), (true, 2), (true, 3)]);
        assert_eq!(observer.borrow().seen, vec![(true, 2), (true, 3), (false, 1)]);
    }

    #[test]
    fn post_immediate_outside_tick_bypasses_queue() {
        let mut pump = MessagePump::new();
        let listener = Rc::new(RefCell::new(Recorder::default()));
        pump.register_listener(&listener);

        pump.post(user(1));
        pump.post_immediate(user(2));

        assert_eq!(listener.borrow().seen, vec![(true, 2)]);
        assert_eq!(pump.queued(), 1);

        pump.pump();
        assert_eq!(listener.borrow().tags(), vec![2, 1]);
    }

    //--- Registration -----------------------------------------------------

    #[test]
    fn unregistering_unknown_listener_is_a_no_op() {
        let mut pump = MessagePump::new();
        let registered = Rc::new(RefCell::new(Recorder::default()));
        let stranger = Rc::new(RefCell::new(Recorder::default()));
        pump.register_listener(&registered);

        pump.unregister_listener(&stranger);
        pump.unregister_listener(&stranger);

        assert_eq!(pump.listener_count(), 1);
        assert!(pump.has_listener(&registered));
        assert!(!pump.has_listener(&stranger));
    }

    #[test]
    fn unregistered_listener_stops_receiving() {
        let mut pump = MessagePump::new();
        let listener = Rc::new(RefCell::new(Recorder::default()));
        pump.register_listener(&listener);

        pump.post(user(1));
        pump.pump();
        pump.unregister_listener(&listener);
        pump.post(user(2));
        pump.pump();

        assert_eq!(listener.borrow().tags(), vec![1]);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_listener_registration_panics() {
        let mut pump = MessagePump::new();
        let listener = Rc::new(RefCell::new(Recorder::default()));
        pump.register_listener(&listener);
        pump.register_listener(&listener);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_source_registration_panics() {
        let mut pump = MessagePump::new();
        let source = Rc::new(RefCell::new(Scripted::new(vec![])));
        pump.register_source(&source);
        pump.register_source(&source);
    }

    #[test]
    fn dropped_listener_is_pruned() {
        let mut pump = MessagePump::new();
        let listener = Rc::new(RefCell::new(Recorder::default()));
        pump.register_listener(&listener);
        drop(listener);

        pump.post(user(1));
        pump.pump();

        assert_eq!(pump.listener_count(), 0);
    }

    //--- Failure semantics ------------------------------------------------

    #[test]
    fn panicking_listener_does_not_stop_dispatch() {
        let mut pump = MessagePump::new();
        let faulty = Rc::new(RefCell::new(Recorder::reacting(1, Reaction::Panic)));
        let healthy = Rc::new(RefCell::new(Recorder::default()));
        pump.register_listener(&faulty);
        pump.register_listener(&healthy);

        pump.post(user(1));
        pump.post(user(2));
        pump.pump();

        assert_eq!(faulty.borrow().tags(), vec![1, 2]);
        assert_eq!(healthy.borrow().tags(), vec![1, 2]);
    }

    #[test]
    fn end_of_stream_keeps_source_registered() {
        let mut pump = MessagePump::new();
        let source = Rc::new(RefCell::new(Scripted::new(vec![])));
        source.borrow_mut().status = PollStatus::EndOfStream;
        pump.register_source(&source);

        pump.pump();
        pump.pump();

        assert_eq!(pump.source_count(), 1);
        assert_eq!(source.borrow().polls, 2);
    }

    #[test]
    fn idle_tick_delivers_nothing() {
        let mut pump = MessagePump::new();
        let listener = Rc::new(RefCell::new(Recorder::default()));
        pump.register_listener(&listener);

        pump.pump();

        assert!(listener.borrow().seen.is_empty());
    }

    #[test]
    fn built_in_events_flow_through() {
        let mut pump = MessagePump::new();

        struct Closer(bool);
        impl Listener for Closer {
            fn on_event(&mut self, event: &Event, _: &mut dyn EventSink) {
                self.0 |= event.is::<WindowClose>();
            }
        }

        let closer = Rc::new(RefCell::new(Closer(false)));
        pump.register_listener(&closer);
        pump.post(Event::from(WindowClose { window: WindowId(1) }));
        pump.pump();

        assert!(closer.borrow().0);
    }
}
