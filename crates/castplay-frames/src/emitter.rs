// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Synchronous single-threaded event emitter
//
// Handlers run to completion inside `fire`, in subscription order. The handler
// list is copied before dispatch, so a handler may subscribe or unsubscribe
// without affecting the current dispatch.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Handler<T> = Rc<dyn Fn(&T)>;

struct Listeners<T> {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(u64, Handler<T>)>>,
}

/// Publishes values of type `T` to subscribed handlers
pub struct EventEmitter<T> {
    listeners: Rc<Listeners<T>>,
}

impl<T: 'static> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(Listeners {
                next_id: Cell::new(0),
                handlers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register `handler`. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe(&self, handler: impl Fn(&T) + 'static) -> Subscription {
        let id = self.listeners.next_id.get();
        self.listeners.next_id.set(id + 1);
        self.listeners.handlers.borrow_mut().push((id, Rc::new(handler)));

        let listeners: Weak<Listeners<T>> = Rc::downgrade(&self.listeners);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(listeners) = listeners.upgrade() {
                    listeners.handlers.borrow_mut().retain(|(handler_id, _)| *handler_id != id);
                }
            })),
        }
    }

    pub fn fire(&self, value: &T) {
        let handlers: Vec<Handler<T>> = self
            .listeners
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            handler(value);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.handlers.borrow().len()
    }
}

impl<T: 'static> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<T> fmt::Debug for EventEmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.handlers.borrow().len())
            .finish()
    }
}

/// Handle returned by [`EventEmitter::subscribe`]
///
/// Dropping it removes the handler; [`detach`](Self::detach) keeps the
/// handler registered for the emitter's lifetime.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    pub fn detach(mut self) {
        self.remove = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}
