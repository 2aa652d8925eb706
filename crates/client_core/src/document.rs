//! The page as the client sees it: three swappable containers holding
//! fragment HTML, plus the state derived from them.
//!
//! Each region keeps the server's markup as received and a view holding the
//! live state. Every mutation goes through the view and re-renders the
//! region's markup from it, so `content` never disagrees with the values a
//! submit would send.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use shared::{
    markup::{Container, DEFAULT_CONFIRMATION_MESSAGE},
    protocol::Method,
};
use tracing::warn;

use crate::{
    form::FormState,
    markup::{InitButton, OkElement, RegionView},
    render,
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Region {
    #[serde(skip)]
    source: String,
    html: String,
    /// Ticket of the request whose response is currently shown.
    generation: u64,
    view: RegionView,
}

impl Region {
    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn view(&self) -> &RegionView {
        &self.view
    }

    fn rerender(&mut self) {
        self.html = render::project(&self.source, &self.view);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModalDialog {
    pub open: bool,
    pub title: Option<String>,
    /// Form groups hidden inside the dialog, by id.
    pub hidden_groups: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingAction {
    pub url: String,
    pub method: Method,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationDialog {
    pub open: bool,
    pub label: String,
    pub message: String,
    pub confirm_text: String,
    pub action: Option<PendingAction>,
}

impl Default for ConfirmationDialog {
    fn default() -> Self {
        Self {
            open: false,
            label: String::new(),
            message: DEFAULT_CONFIRMATION_MESSAGE.to_string(),
            confirm_text: String::new(),
            action: None,
        }
    }
}

/// Result of one marking pass over the editor rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkingPass {
    pub marked: usize,
    pub unmarked: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    regions: BTreeMap<Container, Region>,
    section_title: Option<String>,
    nav_items: bool,
    modal: ModalDialog,
    confirmation: ConfirmationDialog,
    location: Option<String>,
    marking_passes: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            regions: Container::ALL
                .into_iter()
                .map(|container| (container, Region::default()))
                .collect(),
            section_title: Some(String::new()),
            nav_items: true,
            modal: ModalDialog::default(),
            confirmation: ConfirmationDialog::default(),
            location: None,
            marking_passes: 0,
        }
    }

    pub fn region(&self, container: Container) -> &Region {
        &self.regions[&container]
    }

    fn region_mut(&mut self, container: Container) -> &mut Region {
        self.regions.entry(container).or_default()
    }

    pub fn content(&self, container: Container) -> &str {
        self.region(container).html()
    }

    pub fn generation(&self, container: Container) -> u64 {
        self.region(container).generation
    }

    /// Replaces the whole content of a container and rebuilds its view.
    pub fn replace_content(&mut self, container: Container, html: impl Into<String>) {
        let html = html.into();
        let region = self.region_mut(container);
        region.view = RegionView::parse(&html);
        region.source = html.clone();
        region.html = html;
    }

    /// Same as [`Self::replace_content`], recording the ticket of the
    /// response being shown.
    pub(crate) fn inject(&mut self, container: Container, html: String, ticket: u64) {
        self.replace_content(container, html);
        let region = self.region_mut(container);
        region.generation = region.generation.max(ticket);
    }

    pub fn section_title(&self) -> Option<&str> {
        self.section_title.as_deref()
    }

    pub fn set_section_title(&mut self, title: impl Into<String>) {
        match self.section_title.as_mut() {
            Some(current) => *current = title.into(),
            None => warn!("section title element was removed; title update ignored"),
        }
    }

    pub fn nav_items_present(&self) -> bool {
        self.nav_items
    }

    /// Drops the section title and the navigation items from the page.
    pub fn remove_nav_elements(&mut self) {
        self.section_title = None;
        self.nav_items = false;
    }

    /// Text of the first element with this id, searching the fragment,
    /// modal and editor containers in that order.
    pub fn text(&self, id: &str) -> Option<&str> {
        self.regions
            .values()
            .find_map(|region| region.view.texts.get(id))
            .map(String::as_str)
    }

    pub fn set_text(&mut self, id: &str, text: impl Into<String>) -> bool {
        let Some(region) = self
            .regions
            .values_mut()
            .find(|region| region.view.texts.contains_key(id))
        else {
            return false;
        };
        region.view.texts.insert(id.to_string(), text.into());
        region.rerender();
        true
    }

    /// Value of the first control with this id. Form controls answer from
    /// the form state, so this is what a submit would send.
    pub fn input_value(&self, id: &str) -> Option<&str> {
        self.regions.values().find_map(|region| {
            region
                .view
                .forms
                .iter()
                .find_map(|form| form.field(id))
                .map(|field| field.value.as_str())
                .or_else(|| region.view.inputs.get(id).map(String::as_str))
        })
    }

    /// What a user typing into an input does.
    pub fn set_input_value(&mut self, id: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        for region in self.regions.values_mut() {
            let in_form = region
                .view
                .forms
                .iter_mut()
                .any(|form| form.replace_value(id, value.as_str()));
            let updated = in_form
                || match region.view.inputs.get_mut(id) {
                    Some(current) => {
                        *current = value.clone();
                        true
                    }
                    None => false,
                };
            if updated {
                region.rerender();
                return true;
            }
        }
        false
    }

    pub fn form_count(&self) -> usize {
        self.regions
            .values()
            .map(|region| region.view.forms.len())
            .sum()
    }

    /// The first `.form` on the page.
    pub fn form(&self) -> Option<&FormState> {
        self.regions
            .values()
            .find_map(|region| region.view.forms.first())
    }

    /// Applies `update` to the first `.form` and re-renders its region.
    pub fn update_form<R>(&mut self, update: impl FnOnce(&mut FormState) -> R) -> Option<R> {
        let region = self
            .regions
            .values_mut()
            .find(|region| !region.view.forms.is_empty())?;
        let result = update(region.view.forms.first_mut()?);
        region.rerender();
        Some(result)
    }

    pub fn ok_elements(&self, container: Container) -> &[OkElement] {
        &self.region(container).view.ok_elements
    }

    pub fn editor_rows(&self) -> &[OkElement] {
        self.ok_elements(Container::Editor)
    }

    pub fn init_buttons(&self, container: Container) -> &[InitButton] {
        &self.region(container).view.init_buttons
    }

    /// Activates one `.ed-init` element and deactivates every other one on
    /// the page.
    pub fn activate_init_button(&mut self, container: Container, index: usize) -> Option<&InitButton> {
        self.regions.get(&container)?.view.init_buttons.get(index)?;
        for (current, region) in self.regions.iter_mut() {
            if region.view.init_buttons.is_empty() {
                continue;
            }
            for (position, button) in region.view.init_buttons.iter_mut().enumerate() {
                button.active = *current == container && position == index;
            }
            region.rerender();
        }
        self.region(container).view.init_buttons.get(index)
    }

    /// Marks every editor row whose identifier is in `selected` and unmarks
    /// the rest. Every row is visited; only changed rows are counted.
    pub fn mark_editor_rows(&mut self, selected: &[String]) -> MarkingPass {
        let mut pass = MarkingPass::default();
        let region = self.region_mut(Container::Editor);
        for row in region.view.ok_elements.iter_mut() {
            let wanted = row
                .select_id()
                .is_some_and(|id| selected.iter().any(|value| value == id));
            if wanted && !row.marked {
                row.marked = true;
                pass.marked += 1;
            } else if !wanted && row.marked {
                row.marked = false;
                pass.unmarked += 1;
            }
        }
        if pass.marked + pass.unmarked > 0 {
            region.rerender();
        }
        self.marking_passes += 1;
        pass
    }

    pub fn marking_passes(&self) -> u64 {
        self.marking_passes
    }

    pub fn modal(&self) -> &ModalDialog {
        &self.modal
    }

    pub fn modal_mut(&mut self) -> &mut ModalDialog {
        &mut self.modal
    }

    pub fn confirmation(&self) -> &ConfirmationDialog {
        &self.confirmation
    }

    pub fn confirmation_mut(&mut self) -> &mut ConfirmationDialog {
        &mut self.confirmation
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Full page navigation; nothing is pushed to any history.
    pub fn replace_location(&mut self, url: impl Into<String>) {
        self.location = Some(url.into());
    }
}
