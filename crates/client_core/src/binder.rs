//! Dispatch of clicks and hovers on tagged elements.
//!
//! Identifiers map to handlers through explicit tables filled at
//! registration time. Editor-side handlers are rebuilt wholesale on every
//! (re)initialization; handles from an earlier binding are stale.

use std::collections::HashMap;

use shared::markup::{
    Container, HOVER_BACKGROUND, NAV_EDITOR_ID, NAV_FRAGMENT_ID, OK_COURSE_ID, OK_DATE_ID,
    OK_STUDENT_ID, OK_TEACHER_ID, REST_BACKGROUND,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    document::Document,
    markup::{parse_nav_pills, NavPill, OkElement},
    sync::{self, SyncOutcome},
};

pub type OkHandler = fn(&mut Document, &OkElement) -> SyncOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("{table} handler identifier must not be empty")]
    EmptyIdentifier { table: &'static str },
    #[error("{table} handler '{id}' is already registered")]
    Duplicate { table: &'static str, id: String },
}

pub struct DispatchTable<H> {
    name: &'static str,
    handlers: HashMap<String, H>,
}

impl<H> DispatchTable<H> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: impl Into<String>, handler: H) -> Result<(), BindError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(BindError::EmptyIdentifier { table: self.name });
        }
        if self.handlers.contains_key(&id) {
            return Err(BindError::Duplicate {
                table: self.name,
                id,
            });
        }
        self.handlers.insert(id, handler);
        Ok(())
    }

    /// Unknown or missing identifiers are logged and yield `None`.
    pub fn resolve(&self, id: Option<&str>) -> Option<&H> {
        let handler = id.and_then(|id| self.handlers.get(id));
        if handler.is_none() {
            warn!(
                "call to unknown .{} '{}': ignored",
                self.name,
                id.unwrap_or_default()
            );
        }
        handler
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavRoute {
    Fragment,
    Editor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavCommand {
    pub route: NavRoute,
    pub href: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hover {
    Enter,
    Leave,
}

/// Identifies one bound element: the binding it was issued by, the
/// container holding it and its position there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub binding: u64,
    pub container: Container,
    pub index: usize,
}

pub struct EventBinder {
    nav_routes: DispatchTable<NavRoute>,
    ok_handlers: DispatchTable<OkHandler>,
    pills: Vec<NavPill>,
    binding: u64,
    init_handles: Vec<ElementHandle>,
    ok_handles: Vec<ElementHandle>,
}

impl EventBinder {
    pub fn new() -> Self {
        Self {
            nav_routes: DispatchTable::new("nav"),
            ok_handlers: DispatchTable::new("ok"),
            pills: Vec::new(),
            binding: 0,
            init_handles: Vec::new(),
            ok_handles: Vec::new(),
        }
    }

    /// Navigation and field-synchronization routes of the lecture pages.
    pub fn with_default_routes() -> Result<Self, BindError> {
        let mut binder = Self::new();
        binder.register_nav(NAV_FRAGMENT_ID, NavRoute::Fragment)?;
        binder.register_nav(NAV_EDITOR_ID, NavRoute::Editor)?;
        binder.register_ok(OK_DATE_ID, sync::select_date)?;
        binder.register_ok(OK_COURSE_ID, sync::select_course)?;
        binder.register_ok(OK_TEACHER_ID, sync::select_teacher)?;
        binder.register_ok(OK_STUDENT_ID, sync::toggle_student)?;
        Ok(binder)
    }

    pub fn register_nav(&mut self, id: &str, route: NavRoute) -> Result<(), BindError> {
        self.nav_routes.register(id, route)
    }

    pub fn register_ok(&mut self, id: &str, handler: OkHandler) -> Result<(), BindError> {
        self.ok_handlers.register(id, handler)
    }

    /// Binds the navigation pills found in the page layout.
    pub fn init_nav_listeners(&mut self, layout_html: &str) -> usize {
        info!("Initializing navigation listeners");
        self.pills = parse_nav_pills(layout_html);
        self.pills.len()
    }

    pub fn nav_pills(&self) -> &[NavPill] {
        &self.pills
    }

    pub fn nav_click(&self, index: usize) -> Option<NavCommand> {
        let Some(pill) = self.pills.get(index) else {
            warn!("no navigation pill at position {index}");
            return None;
        };
        self.dispatch_nav(pill.id.as_deref(), pill.href.as_deref())
    }

    pub fn dispatch_nav(&self, id: Option<&str>, href: Option<&str>) -> Option<NavCommand> {
        let route = *self.nav_routes.resolve(id)?;
        let Some(href) = href else {
            warn!("navigation pill '{}' has no href", id.unwrap_or_default());
            return None;
        };
        Some(NavCommand {
            route,
            href: href.to_string(),
        })
    }

    /// Cosmetic hover on a pill; active pills keep their background.
    pub fn nav_hover(&mut self, index: usize, hover: Hover) -> Option<&str> {
        let pill = self.pills.get_mut(index)?;
        if pill.active {
            return pill.background.as_deref();
        }
        pill.background = Some(
            match hover {
                Hover::Enter => HOVER_BACKGROUND,
                Hover::Leave => REST_BACKGROUND,
            }
            .to_string(),
        );
        pill.background.as_deref()
    }

    /// Drops every editor-side handle and binds the `.ed-init` and `.ok`
    /// elements currently on the page.
    pub fn init_editor_listeners(&mut self, doc: &Document) -> u64 {
        self.binding += 1;
        let binding = self.binding;
        self.init_handles.clear();
        self.ok_handles.clear();

        for container in Container::ALL {
            self.init_handles.extend(
                (0..doc.init_buttons(container).len()).map(|index| ElementHandle {
                    binding,
                    container,
                    index,
                }),
            );
            self.ok_handles.extend(
                (0..doc.ok_elements(container).len()).map(|index| ElementHandle {
                    binding,
                    container,
                    index,
                }),
            );
        }

        info!(
            binding,
            init = self.init_handles.len(),
            ok = self.ok_handles.len(),
            "Initializing editor listeners"
        );
        binding
    }

    pub fn binding(&self) -> u64 {
        self.binding
    }

    pub fn init_handles(&self) -> &[ElementHandle] {
        &self.init_handles
    }

    pub fn ok_handles(&self) -> &[ElementHandle] {
        &self.ok_handles
    }

    fn is_current(&self, handle: ElementHandle, handles: &[ElementHandle]) -> bool {
        if handle.binding != self.binding || !handles.contains(&handle) {
            warn!(
                binding = handle.binding,
                current = self.binding,
                "click on a detached element ignored"
            );
            return false;
        }
        true
    }

    /// Activates the clicked init element, deactivates its siblings and
    /// returns the editor URL to load.
    pub fn editor_init_click(&self, doc: &mut Document, handle: ElementHandle) -> Option<String> {
        if !self.is_current(handle, &self.init_handles) {
            return None;
        }

        let button = doc.activate_init_button(handle.container, handle.index)?;
        if button.href.is_none() {
            warn!("editor init element '{}' has no href", button.text);
        }
        button.href.clone()
    }

    pub fn ok_click(&self, doc: &mut Document, handle: ElementHandle) -> Option<SyncOutcome> {
        if !self.is_current(handle, &self.ok_handles) {
            return None;
        }

        let source = doc.ok_elements(handle.container).get(handle.index)?.clone();
        let handler = *self.ok_handlers.resolve(source.id.as_deref())?;
        debug!(id = ?source.id, "ok dispatched");
        Some(handler(doc, &source))
    }
}

impl Default for EventBinder {
    fn default() -> Self {
        Self::new()
    }
}
