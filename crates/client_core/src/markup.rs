//! Read-only projections of injected fragments.
//!
//! Every fragment is parsed once, when it is injected. The resulting
//! [`RegionView`] owns plain data only, so nothing from the HTML parser
//! outlives the call and the async client stays `Send`.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use shared::markup::{
    ACTIVE_CLASS, EDITOR_INIT_CLASS, FORM_CLASS, MODAL_FRAGMENT_CLASS, NAV_PILL_CLASS, OK_CLASS,
    SELECTED_MARKER_CLASS, SELECT_ID,
};

use crate::form::FormState;

/// Position of the first modal marker among its element siblings, the way
/// `$(html).find(marker).index()` reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalMarker {
    Absent,
    Present { index: usize },
}

impl ModalMarker {
    /// `-1` when absent.
    pub fn index(self) -> i64 {
        match self {
            Self::Absent => -1,
            Self::Present { index } => index as i64,
        }
    }

    pub fn is_present(self) -> bool {
        matches!(self, Self::Present { .. })
    }
}

pub fn find_modal_marker(html: &str) -> ModalMarker {
    let fragment = Html::parse_fragment(html);
    let Some(selector) = class_selector(MODAL_FRAGMENT_CLASS) else {
        return ModalMarker::Absent;
    };

    match fragment.select(&selector).next() {
        Some(marker) => ModalMarker::Present {
            index: marker
                .prev_siblings()
                .filter(|node| node.value().is_element())
                .count(),
        },
        None => ModalMarker::Absent,
    }
}

/// An element tagged with the `ok` class: a confirm button or a picker row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OkElement {
    pub id: Option<String>,
    /// Text of every descendant carrying an id, keyed by that id.
    pub cells: BTreeMap<String, String>,
    pub marked: bool,
}

impl OkElement {
    fn from_element(element: ElementRef<'_>) -> Self {
        let mut cells = BTreeMap::new();
        for child in element.descendants().filter_map(ElementRef::wrap).skip(1) {
            if let Some(id) = child.value().id() {
                cells
                    .entry(id.to_string())
                    .or_insert_with(|| element_text(child));
            }
        }

        Self {
            id: element.value().id().map(str::to_string),
            cells,
            marked: has_class(element, SELECTED_MARKER_CLASS),
        }
    }

    pub fn cell(&self, id: &str) -> Option<&str> {
        self.cells.get(id).map(String::as_str)
    }

    /// The identifier shown in the row, if it is a picker row.
    pub fn select_id(&self) -> Option<&str> {
        self.cell(SELECT_ID)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitButton {
    pub href: Option<String>,
    pub text: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavPill {
    pub id: Option<String>,
    pub href: Option<String>,
    pub active: bool,
    pub background: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegionView {
    /// First element per id, with its trimmed text.
    pub texts: BTreeMap<String, String>,
    /// `value` of every `input`/`textarea`/`select` carrying an id outside
    /// any `.form`. Controls inside a form live in [`Self::forms`] only.
    pub inputs: BTreeMap<String, String>,
    pub forms: Vec<FormState>,
    pub ok_elements: Vec<OkElement>,
    pub init_buttons: Vec<InitButton>,
}

impl RegionView {
    pub fn parse(html: &str) -> Self {
        let fragment = Html::parse_fragment(html);
        let mut view = Self::default();

        for element in fragment.root_element().descendants().filter_map(ElementRef::wrap) {
            if let Some(id) = element.value().id() {
                view.texts
                    .entry(id.to_string())
                    .or_insert_with(|| element_text(element));
                if is_value_control(element) && !inside_form(element) {
                    view.inputs
                        .entry(id.to_string())
                        .or_insert_with(|| control_value(element));
                }
            }
        }

        if let Some(selector) = class_selector(FORM_CLASS) {
            view.forms = fragment
                .select(&selector)
                .map(FormState::from_element)
                .collect();
        }
        if let Some(selector) = class_selector(OK_CLASS) {
            view.ok_elements = fragment
                .select(&selector)
                .map(OkElement::from_element)
                .collect();
        }
        if let Some(selector) = class_selector(EDITOR_INIT_CLASS) {
            view.init_buttons = fragment
                .select(&selector)
                .map(|element| InitButton {
                    href: element.value().attr("href").map(str::to_string),
                    text: element_text(element),
                    active: has_class(element, ACTIVE_CLASS),
                })
                .collect();
        }

        view
    }
}

pub fn parse_nav_pills(html: &str) -> Vec<NavPill> {
    let fragment = Html::parse_fragment(html);
    let Some(selector) = class_selector(NAV_PILL_CLASS) else {
        return Vec::new();
    };

    fragment
        .select(&selector)
        .map(|element| NavPill {
            id: element.value().id().map(str::to_string),
            href: element.value().attr("href").map(str::to_string),
            active: has_class(element, ACTIVE_CLASS),
            background: None,
        })
        .collect()
}

pub(crate) fn class_selector(class: &str) -> Option<Selector> {
    Selector::parse(&format!(".{class}")).ok()
}

pub(crate) fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|candidate| candidate == class)
}

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn is_value_control(element: ElementRef<'_>) -> bool {
    matches!(element.value().name(), "input" | "textarea" | "select")
}

pub(crate) fn control_value(element: ElementRef<'_>) -> String {
    match element.value().name() {
        "textarea" => element.text().collect(),
        "select" => selected_option(element).unwrap_or_default(),
        "input" if is_checkable(element) => element.value().attr("value").unwrap_or("on").to_string(),
        _ => element.value().attr("value").unwrap_or_default().to_string(),
    }
}

fn inside_form(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| has_class(ancestor, FORM_CLASS))
}

fn is_checkable(element: ElementRef<'_>) -> bool {
    element
        .value()
        .attr("type")
        .is_some_and(|kind| kind.eq_ignore_ascii_case("checkbox") || kind.eq_ignore_ascii_case("radio"))
}

fn selected_option(select: ElementRef<'_>) -> Option<String> {
    let options: Vec<ElementRef<'_>> = select
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "option")
        .collect();
    let chosen = options
        .iter()
        .find(|option| option.value().attr("selected").is_some())
        .or_else(|| options.first())?;

    Some(
        chosen
            .value()
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| element_text(*chosen)),
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_absent_reports_minus_one() {
        let marker = find_modal_marker("<table class=\"table\"><tr><td>1</td></tr></table>");
        assert_eq!(marker, ModalMarker::Absent);
        assert_eq!(marker.index(), -1);
    }

    #[test]
    fn marker_index_counts_element_siblings_only() {
        let html = "text <p>a</p> <div class=\"modal modalFragment\"></div>";
        let marker = find_modal_marker(html);
        assert_eq!(marker, ModalMarker::Present { index: 1 });
    }

    #[test]
    fn nested_marker_is_found() {
        let html = "<section><div><span class=\"modalFragment\">x</span></div></section>";
        assert!(find_modal_marker(html).is_present());
    }

    #[test]
    fn picker_rows_expose_cells_and_marks() {
        let html = r#"
            <table>
              <tr class="ok alert-success" id="studentOk"><td id="selectId"> 7 </td><td id="selectFirstName">Ann</td></tr>
              <tr class="ok" id="studentOk"><td id="selectId">8</td></tr>
            </table>"#;
        let view = RegionView::parse(html);
        assert_eq!(view.ok_elements.len(), 2);
        assert_eq!(view.ok_elements[0].select_id(), Some("7"));
        assert_eq!(view.ok_elements[0].cell("selectFirstName"), Some("Ann"));
        assert!(view.ok_elements[0].marked);
        assert!(!view.ok_elements[1].marked);
        assert_eq!(view.ok_elements[1].id.as_deref(), Some("studentOk"));
    }

    #[test]
    fn region_view_indexes_inputs_and_first_text_per_id() {
        let html = r#"
            <span id="table-date">2024-01-01 09:00</span>
            <input id="datetime-input" type="datetime-local" value="2024-05-01T10:00">
            <span id="table-date">duplicate</span>"#;
        let view = RegionView::parse(html);
        assert_eq!(view.texts["table-date"], "2024-01-01 09:00");
        assert_eq!(view.inputs["datetime-input"], "2024-05-01T10:00");
    }

    #[test]
    fn form_controls_are_not_indexed_as_loose_inputs() {
        let html = r#"
            <input id="datetime-input" value="2024-05-01T10:00">
            <form class="form" action="/saveLecture">
              <input id="form-date" type="hidden" name="date" value="2024-04-01T09:00">
            </form>"#;
        let view = RegionView::parse(html);
        assert!(view.inputs.contains_key("datetime-input"));
        assert!(!view.inputs.contains_key("form-date"));
        assert_eq!(
            view.forms[0].field("form-date").map(|field| field.value.as_str()),
            Some("2024-04-01T09:00")
        );
    }

    #[test]
    fn first_of_several_markers_decides_the_index() {
        let html = r#"<h5>Lecture</h5>
            <div class="modal modalFragment" id="first"></div>
            <p>between</p>
            <div class="modalFragment" id="second"></div>"#;
        assert_eq!(find_modal_marker(html), ModalMarker::Present { index: 1 });

        let nested_first = r#"<section><span class="modalFragment"></span></section>
            <div></div><div class="modalFragment"></div>"#;
        assert_eq!(find_modal_marker(nested_first).index(), 0);
    }

    #[test]
    fn init_buttons_and_nav_pills_are_collected() {
        let html = r#"
            <a class="ed-init active" href="/coursePicker">Course</a>
            <a class="ed-init" href="/memberPicker?memberType=2">Students</a>"#;
        let view = RegionView::parse(html);
        assert_eq!(view.init_buttons.len(), 2);
        assert!(view.init_buttons[0].active);
        assert_eq!(view.init_buttons[1].href.as_deref(), Some("/memberPicker?memberType=2"));

        let pills = parse_nav_pills(
            r#"<a class="navPills active" id="fragNav" href="/lectures">L</a>
               <a class="navPills" id="editNav" href="/lectureEditor">E</a>"#,
        );
        assert_eq!(pills.len(), 2);
        assert!(pills[0].active);
        assert_eq!(pills[1].id.as_deref(), Some("editNav"));
    }

    #[test]
    fn escape_html_covers_attribute_breakers() {
        assert_eq!(escape_html(r#"<a href="x">'&'"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;");
    }
}
