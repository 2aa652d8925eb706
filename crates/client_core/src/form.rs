//! In-memory model of the page's single `.form` element.
//!
//! Hidden multi-valued inputs are held as an ordered set of values per
//! group; the markup they would render to is a projection of that set.

use scraper::ElementRef;
use serde::Serialize;
use shared::{
    markup::{MultiFieldBinding, MULTI_FIELDS},
    protocol::Method,
};
use url::form_urlencoded;

use crate::markup::{control_value, escape_html};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub id: Option<String>,
    pub name: Option<String>,
    pub value: String,
    /// Whether the control contributes to the submitted data set.
    pub successful: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiValued {
    pub container_id: String,
    pub input_id: String,
    pub name: String,
    values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
    /// The set already matched the request.
    Unchanged,
}

impl MultiValued {
    fn new(binding: &MultiFieldBinding) -> Self {
        Self {
            container_id: binding.container_id.to_string(),
            input_id: binding.input_id.to_string(),
            name: binding.name.to_string(),
            values: Vec::new(),
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|existing| existing == value)
    }

    /// Returns `false` when the value is already present.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.contains(&value) {
            return false;
        }
        self.values.push(value);
        true
    }

    pub fn remove(&mut self, value: &str) -> bool {
        let before = self.values.len();
        self.values.retain(|existing| existing != value);
        self.values.len() != before
    }

    /// Hidden inputs as they appear inside the group's container.
    pub fn render(&self) -> String {
        self.values
            .iter()
            .map(|value| {
                format!(
                    "<input id=\"{}\" type=\"hidden\" name=\"{}\" value=\"{}\">",
                    escape_html(&self.input_id),
                    escape_html(&self.name),
                    escape_html(value)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormControl {
    Single(FormField),
    Multi(MultiValued),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormState {
    action: Option<String>,
    method: Method,
    controls: Vec<FormControl>,
}

impl FormState {
    pub fn from_element(form: ElementRef<'_>) -> Self {
        let method = form
            .value()
            .attr("method")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        let mut state = Self {
            action: form.value().attr("action").map(str::to_string),
            method,
            controls: Vec::new(),
        };

        for element in form.descendants().filter_map(ElementRef::wrap).skip(1) {
            let id = element.value().id();
            if let Some(binding) = id.and_then(multi_binding_for_container) {
                state.ensure_multi(binding);
                continue;
            }
            if !matches!(
                element.value().name(),
                "input" | "select" | "textarea" | "button"
            ) {
                continue;
            }
            if let Some(binding) = id.and_then(multi_binding_for_input) {
                if let Some(group) = state.ensure_multi(binding) {
                    group.insert(control_value(element));
                }
                continue;
            }
            state.controls.push(FormControl::Single(FormField {
                id: id.map(str::to_string),
                name: element.value().attr("name").map(str::to_string),
                value: control_value(element),
                successful: is_successful(element),
            }));
        }

        state
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn controls(&self) -> &[FormControl] {
        &self.controls
    }

    fn ensure_multi(&mut self, binding: &MultiFieldBinding) -> Option<&mut MultiValued> {
        if self.multi(binding.input_id).is_none() {
            self.controls
                .push(FormControl::Multi(MultiValued::new(binding)));
        }
        self.multi_mut(binding.input_id)
    }

    pub fn field(&self, input_id: &str) -> Option<&FormField> {
        self.controls.iter().find_map(|control| match control {
            FormControl::Single(field) if field.id.as_deref() == Some(input_id) => Some(field),
            _ => None,
        })
    }

    pub fn multi(&self, input_id: &str) -> Option<&MultiValued> {
        self.controls.iter().find_map(|control| match control {
            FormControl::Multi(group) if group.input_id == input_id => Some(group),
            _ => None,
        })
    }

    /// The group rendered inside the element with this id.
    pub fn multi_by_container(&self, container_id: &str) -> Option<&MultiValued> {
        self.controls.iter().find_map(|control| match control {
            FormControl::Multi(group) if group.container_id == container_id => Some(group),
            _ => None,
        })
    }

    pub fn multi_mut(&mut self, input_id: &str) -> Option<&mut MultiValued> {
        self.controls.iter_mut().find_map(|control| match control {
            FormControl::Multi(group) if group.input_id == input_id => Some(group),
            _ => None,
        })
    }

    /// Overwrites the value of the single-valued input with this id.
    pub fn replace_value(&mut self, input_id: &str, value: impl Into<String>) -> bool {
        let field = self.controls.iter_mut().find_map(|control| match control {
            FormControl::Single(field) if field.id.as_deref() == Some(input_id) => Some(field),
            _ => None,
        });
        match field {
            Some(field) => {
                field.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Every value currently carried by inputs with this id.
    pub fn values_by_id(&self, input_id: &str) -> Vec<String> {
        let mut values = Vec::new();
        for control in &self.controls {
            match control {
                FormControl::Single(field) if field.id.as_deref() == Some(input_id) => {
                    values.push(field.value.clone());
                }
                FormControl::Multi(group) if group.input_id == input_id => {
                    values.extend(group.values.iter().cloned());
                }
                _ => {}
            }
        }
        values
    }

    /// Removes `value` when `selected`, appends it otherwise.
    pub fn toggle(&mut self, input_id: &str, value: &str, selected: bool) -> Option<Toggle> {
        let group = self.multi_mut(input_id)?;
        let changed = if selected {
            group.remove(value)
        } else {
            group.insert(value)
        };
        Some(match (changed, selected) {
            (false, _) => Toggle::Unchanged,
            (true, true) => Toggle::Removed,
            (true, false) => Toggle::Added,
        })
    }

    pub fn serialize_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for control in &self.controls {
            match control {
                FormControl::Single(field) if field.successful => {
                    if let Some(name) = field.name.as_deref().filter(|name| !name.is_empty()) {
                        pairs.push((name.to_string(), field.value.clone()));
                    }
                }
                FormControl::Single(_) => {}
                FormControl::Multi(group) => {
                    pairs.extend(
                        group
                            .values
                            .iter()
                            .map(|value| (group.name.clone(), value.clone())),
                    );
                }
            }
        }
        pairs
    }

    /// `application/x-www-form-urlencoded` body.
    pub fn serialize(&self) -> String {
        encode_pairs(&self.serialize_pairs())
    }
}

pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn multi_binding_for_container(id: &str) -> Option<&'static MultiFieldBinding> {
    MULTI_FIELDS.iter().find(|binding| binding.container_id == id)
}

fn multi_binding_for_input(id: &str) -> Option<&'static MultiFieldBinding> {
    MULTI_FIELDS.iter().find(|binding| binding.input_id == id)
}

fn is_successful(element: ElementRef<'_>) -> bool {
    let attrs = element.value();
    if attrs.attr("name").map_or(true, str::is_empty) || attrs.attr("disabled").is_some() {
        return false;
    }
    match attrs.name() {
        "button" => false,
        "input" => {
            let kind = attrs.attr("type").unwrap_or("text").to_ascii_lowercase();
            match kind.as_str() {
                "submit" | "button" | "reset" | "image" | "file" => false,
                "checkbox" | "radio" => attrs.attr("checked").is_some(),
                _ => true,
            }
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::*;

    fn parse(html: &str) -> FormState {
        let fragment = Html::parse_fragment(html);
        let selector = Selector::parse(".form").expect("selector");
        let form = fragment.select(&selector).next().expect("form");
        FormState::from_element(form)
    }

    const LECTURE_FORM: &str = r#"
        <form class="form" action="/saveLecture" method="post">
          <input type="hidden" name="lectureId" value="12">
          <input id="form-date" type="hidden" name="date" value="2024-04-01T09:00">
          <input id="form-courseId" type="hidden" name="courseId" value="3">
          <input id="form-teacherId" type="hidden" name="teacherId" value="5">
          <div id="form-students">
            <input id="form-studentId" type="hidden" name="studentId" value="1">
            <input id="form-studentId" type="hidden" name="studentId" value="2">
          </div>
          <input type="checkbox" name="archived" value="yes">
          <input type="text" name="room" value="B-12" disabled>
          <button type="submit" name="save">Save</button>
        </form>"#;

    #[test]
    fn parses_action_method_and_groups() {
        let form = parse(LECTURE_FORM);
        assert_eq!(form.action(), Some("/saveLecture"));
        assert_eq!(form.method(), Method::Post);
        assert_eq!(form.values_by_id("form-studentId"), vec!["1", "2"]);
        assert_eq!(form.values_by_id("form-courseId"), vec!["3"]);
    }

    #[test]
    fn serializes_only_successful_controls_in_document_order() {
        let form = parse(LECTURE_FORM);
        assert_eq!(
            form.serialize(),
            "lectureId=12&date=2024-04-01T09%3A00&courseId=3&teacherId=5&studentId=1&studentId=2"
        );
    }

    #[test]
    fn toggle_adds_and_removes_values() {
        let mut form = parse(LECTURE_FORM);
        assert_eq!(form.toggle("form-studentId", "3", false), Some(Toggle::Added));
        assert_eq!(form.values_by_id("form-studentId"), vec!["1", "2", "3"]);
        assert_eq!(form.toggle("form-studentId", "1", true), Some(Toggle::Removed));
        assert_eq!(form.values_by_id("form-studentId"), vec!["2", "3"]);
    }

    #[test]
    fn toggle_reports_unchanged_when_set_already_matches() {
        let mut form = parse(LECTURE_FORM);
        assert_eq!(form.toggle("form-studentId", "1", false), Some(Toggle::Unchanged));
        assert_eq!(form.toggle("form-studentId", "9", true), Some(Toggle::Unchanged));
        assert_eq!(form.values_by_id("form-studentId"), vec!["1", "2"]);
    }

    #[test]
    fn checkbox_without_value_submits_on() {
        let form = parse(
            r#"<form class="form" action="/x">
                 <input type="checkbox" name="archived" checked>
                 <input type="radio" name="kind" value="lab" checked>
               </form>"#,
        );
        assert_eq!(form.serialize(), "archived=on&kind=lab");
    }

    #[test]
    fn toggle_without_group_is_rejected() {
        let mut form = parse(r#"<form class="form" action="/x"><input name="a" value="b"></form>"#);
        assert_eq!(form.toggle("form-studentId", "1", false), None);
    }

    #[test]
    fn empty_group_container_is_kept_as_control() {
        let form = parse(
            r#"<form class="form" action="/saveLecture"><div id="form-students"></div></form>"#,
        );
        let group = form.multi("form-studentId").expect("group");
        assert!(group.values().is_empty());
        assert_eq!(form.method(), Method::Get);
    }

    #[test]
    fn replace_value_is_last_write_wins() {
        let mut form = parse(LECTURE_FORM);
        assert!(form.replace_value("form-courseId", "9"));
        assert!(form.replace_value("form-courseId", "10"));
        assert_eq!(form.field("form-courseId").map(|f| f.value.as_str()), Some("10"));
        assert!(!form.replace_value("form-missing", "1"));
    }

    #[test]
    fn render_projects_hidden_inputs() {
        let form = parse(LECTURE_FORM);
        let group = form.multi("form-studentId").expect("group");
        assert_eq!(
            group.render(),
            "<input id=\"form-studentId\" type=\"hidden\" name=\"studentId\" value=\"1\">\n\
             <input id=\"form-studentId\" type=\"hidden\" name=\"studentId\" value=\"2\">"
        );
    }
}
