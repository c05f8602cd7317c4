//! Module registry: cross-fragment capability tables with an asynchronous
//! readiness barrier.
//!
//! Independently-loaded UI fragments discover each other here by name.
//! Local fragments [`Registry::export`] capability tables; consumers
//! [`Registry::import`] them, which never blocks: an unknown name starts a
//! remote fetch and hands back an empty table that fills in once the
//! payload arrives. [`Registry::ready`] callbacks run only after every
//! import outstanding at their registration has resolved.
//!
//! The registry is an explicit object handed to whoever needs it; tests
//! construct a fresh one per case. All execution is single-threaded and
//! cooperative, so interior mutability stands in for locking.

pub mod remote;

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::value::{new_table, TableRef, Value};

pub use remote::{ChannelAuthority, ModulePayload, ModuleRequest, RemoteAuthority, SessionToken};

/// Resolution state of a known module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Referenced by an import, awaiting the remote payload.
    PendingRemote,
    /// Exported locally at least once.
    Ready,
}

struct ModuleEntry {
    table: TableRef,
    state: ModuleState,
}

#[derive(Default)]
struct RegistryState {
    modules: IndexMap<String, ModuleEntry>,
    /// Module names awaiting a remote payload. The barrier holds iff empty.
    pending: IndexSet<String>,
    ready_queue: Vec<Box<dyn FnOnce()>>,
}

/// The process-scoped module namespace.
pub struct Registry {
    state: RefCell<RegistryState>,
    authority: Option<Rc<dyn RemoteAuthority>>,
    session: SessionToken,
}

impl Registry {
    /// A registry with no remote authority and the default session token.
    ///
    /// Imports of unknown modules will stall forever (logged), which is
    /// the designed behavior when nobody answers fetches.
    pub fn new() -> Self {
        Self::with_session(SessionToken::default())
    }

    /// A registry with no remote authority and an explicit session token.
    pub fn with_session(session: SessionToken) -> Self {
        Self {
            state: RefCell::new(RegistryState::default()),
            authority: None,
            session,
        }
    }

    /// A registry that issues fetches through `authority`.
    pub fn with_authority(authority: Rc<dyn RemoteAuthority>, session: SessionToken) -> Self {
        Self {
            state: RefCell::new(RegistryState::default()),
            authority: Some(authority),
            session,
        }
    }

    /// Merge `table`'s keys into the module's capability table, creating
    /// the module on first use, and mark it ready.
    ///
    /// The module's table keeps its identity: keys are copied in (matching
    /// keys overwritten, others preserved), never the table replaced, so
    /// fragments already holding the table observe the new keys. Returns
    /// the canonical table.
    pub fn export(&self, name: &str, table: TableRef) -> TableRef {
        let entry_table = {
            let mut state = self.state.borrow_mut();
            let entry = state
                .modules
                .entry(name.to_owned())
                .or_insert_with(|| ModuleEntry {
                    table: new_table(),
                    state: ModuleState::Ready,
                });
            entry.state = ModuleState::Ready;
            entry.table.clone()
        };
        if !Rc::ptr_eq(&entry_table, &table) {
            let entries: Vec<(String, Value)> = table
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let mut dst = entry_table.borrow_mut();
            for (key, value) in entries {
                dst.insert(key, value);
            }
        }
        debug!(module = name, "module exported");
        entry_table
    }

    /// Resolve a module's capability table. Never blocks.
    ///
    /// A known module (ready or pending) returns its live table
    /// immediately; the caller may hold it and watch it fill in. An
    /// unknown module gets an empty table, joins the pending set, and a
    /// fetch goes out to the remote authority.
    pub fn import(&self, name: &str) -> TableRef {
        if let Some(table) = self
            .state
            .borrow()
            .modules
            .get(name)
            .map(|entry| entry.table.clone())
        {
            return table;
        }

        let table = new_table();
        {
            let mut state = self.state.borrow_mut();
            state.modules.insert(
                name.to_owned(),
                ModuleEntry {
                    table: table.clone(),
                    state: ModuleState::PendingRemote,
                },
            );
            state.pending.insert(name.to_owned());
        }
        debug!(module = name, "import pending on remote fetch");
        match &self.authority {
            Some(authority) => authority.request_module(ModuleRequest {
                module: name.to_owned(),
                token: self.session.clone(),
            }),
            None => warn!(
                module = name,
                "import with no remote authority configured; module stays pending"
            ),
        }
        table
    }

    /// Mark a remotely-fetched module as resolved.
    ///
    /// Removes it from the pending set; when the set empties, the queued
    /// ready callbacks run in registration order, exactly once.
    pub fn module_ready(&self, name: &str) {
        let became_empty = {
            let mut state = self.state.borrow_mut();
            if !state.pending.shift_remove(name) {
                debug!(module = name, "module_ready for a module that was not pending");
                return;
            }
            state.pending.is_empty()
        };
        debug!(module = name, "module resolved");
        if became_empty {
            self.drain_ready();
        }
    }

    /// Run `callback` once every import outstanding right now has resolved.
    ///
    /// With nothing pending the callback runs synchronously before this
    /// returns; otherwise it queues. Imports started after the callback has
    /// run never retroactively affect it.
    pub fn ready(&self, callback: impl FnOnce() + 'static) {
        let run_now = self.state.borrow().pending.is_empty();
        if run_now {
            callback();
        } else {
            self.state.borrow_mut().ready_queue.push(Box::new(callback));
        }
    }

    /// Handle one inbound payload message.
    ///
    /// Payloads carrying another session's token are dropped. The
    /// definition is decoded into a capability table, exported under the
    /// module's name, and the module marked resolved.
    pub fn deliver(&self, payload: ModulePayload) {
        if payload.token != self.session {
            debug!(
                module = payload.module.as_str(),
                token = payload.token.as_str(),
                "payload for another session ignored"
            );
            return;
        }
        let table = match Value::from(payload.definition) {
            Value::Table(table) => table,
            other => {
                warn!(
                    module = payload.module.as_str(),
                    ?other,
                    "capability definition is not a mapping; module resolves empty"
                );
                new_table()
            }
        };
        self.export(&payload.module, table);
        self.module_ready(&payload.module);
    }

    /// Pump every payload currently sitting in the channel. Non-blocking;
    /// meant to be called once per driver tick.
    pub fn drain_inbound(
        &self,
        receiver: &mut tokio::sync::mpsc::UnboundedReceiver<ModulePayload>,
    ) -> usize {
        let mut delivered = 0;
        while let Ok(payload) = receiver.try_recv() {
            self.deliver(payload);
            delivered += 1;
        }
        delivered
    }

    /// Whether every import issued so far has resolved.
    pub fn is_ready(&self) -> bool {
        self.state.borrow().pending.is_empty()
    }

    /// Whether this module is still awaiting its remote payload.
    pub fn is_pending(&self, name: &str) -> bool {
        self.state.borrow().pending.contains(name)
    }

    /// The module's resolution state, if it has ever been referenced.
    pub fn module_state(&self, name: &str) -> Option<ModuleState> {
        self.state.borrow().modules.get(name).map(|entry| entry.state)
    }

    /// Drain the ready queue while the pending set stays empty.
    ///
    /// The queue is swapped out before invoking anything: callbacks may
    /// re-enter the registry (register more callbacks, import, export).
    fn drain_ready(&self) {
        loop {
            let callbacks = {
                let mut state = self.state.borrow_mut();
                if !state.pending.is_empty() || state.ready_queue.is_empty() {
                    return;
                }
                std::mem::take(&mut state.ready_queue)
            };
            for callback in callbacks {
                callback();
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
