//! Explicit observer lists with synchronous dispatch.
//!
//! Each event kind owns an [`EventEmitter`]; observers connect and receive
//! an [`ObserverKey`] used to disconnect later. Dispatch is synchronous -
//! callers needing deferred execution enqueue to their own task queue.

/// Handle returned by `connect`/`once`, used to cancel the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverKey(u64);

struct Observer<T> {
    key: ObserverKey,
    once: bool,
    func: Box<dyn FnMut(&T) + Send>,
}

/// Observer list for one event kind.
pub struct EventEmitter<T> {
    next_key: u64,
    observers: Vec<Observer<T>>,
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            next_key: 0,
            observers: Vec::new(),
        }
    }

    /// Subscribes an observer invoked on every emit until disconnected.
    pub fn connect(&mut self, func: impl FnMut(&T) + Send + 'static) -> ObserverKey {
        self.subscribe(false, Box::new(func))
    }

    /// Subscribes an observer invoked for the next emit only.
    pub fn once(&mut self, func: impl FnMut(&T) + Send + 'static) -> ObserverKey {
        self.subscribe(true, Box::new(func))
    }

    fn subscribe(&mut self, once: bool, func: Box<dyn FnMut(&T) + Send>) -> ObserverKey {
        let key = ObserverKey(self.next_key);
        self.next_key += 1;
        self.observers.push(Observer { key, once, func });
        key
    }

    /// Removes an observer. Returns false if the key was already gone.
    pub fn disconnect(&mut self, key: &ObserverKey) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.key != *key);
        self.observers.len() != before
    }

    /// Synchronously invokes every observer with the payload. `once`
    /// observers are removed after firing.
    pub fn emit(&mut self, payload: &T) {
        let mut index = 0;
        while index < self.observers.len() {
            (self.observers[index].func)(payload);
            if self.observers[index].once {
                self.observers.remove(index);
            } else {
                index += 1;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}
