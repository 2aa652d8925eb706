//! Writes a region's state back into markup.
//!
//! The server's fragment is re-serialized with the current values, texts,
//! row marks, active init buttons and multi-valued hidden inputs applied.
//! Only the first element per id carries state, matching how the view was
//! built.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Node};
use shared::markup::{ACTIVE_CLASS, EDITOR_INIT_CLASS, FORM_CLASS, OK_CLASS, SELECTED_MARKER_CLASS};

use crate::markup::{element_text, escape_html, has_class, RegionView};

const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

enum Body {
    Keep,
    Text(String),
    Markup(String),
}

pub fn project(source: &str, view: &RegionView) -> String {
    let fragment = Html::parse_fragment(source);
    let mut projector = Projector {
        view,
        out: String::with_capacity(source.len()),
        seen_ids: HashSet::new(),
        forms_seen: 0,
        current_form: None,
        ok_seen: 0,
        init_seen: 0,
    };
    projector.children(fragment.root_element(), false);
    projector.out
}

struct Projector<'v> {
    view: &'v RegionView,
    out: String,
    seen_ids: HashSet<String>,
    forms_seen: usize,
    current_form: Option<usize>,
    ok_seen: usize,
    init_seen: usize,
}

impl Projector<'_> {
    fn children(&mut self, parent: ElementRef<'_>, raw_text: bool) {
        for child in parent.children() {
            match child.value() {
                Node::Text(text) if raw_text => self.out.push_str(text),
                Node::Text(text) => self.out.push_str(&escape_html(text)),
                Node::Comment(comment) => {
                    self.out.push_str("<!--");
                    self.out.push_str(comment);
                    self.out.push_str("-->");
                }
                Node::Element(_) => {
                    if let Some(element) = ElementRef::wrap(child) {
                        self.element(element);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        let id = element.value().id();
        let owns_id = id.is_some_and(|id| self.seen_ids.insert(id.to_string()));

        let mut class_changes: Vec<(&str, bool)> = Vec::new();
        if has_class(element, OK_CLASS) {
            if let Some(row) = self.view.ok_elements.get(self.ok_seen) {
                class_changes.push((SELECTED_MARKER_CLASS, row.marked));
            }
            self.ok_seen += 1;
        }
        if has_class(element, EDITOR_INIT_CLASS) {
            if let Some(button) = self.view.init_buttons.get(self.init_seen) {
                class_changes.push((ACTIVE_CLASS, button.active));
            }
            self.init_seen += 1;
        }

        let enclosing_form = self.current_form;
        if has_class(element, FORM_CLASS) {
            self.current_form = Some(self.forms_seen);
            self.forms_seen += 1;
        }

        let id = id.filter(|_| owns_id);
        let value = id.and_then(|id| self.control_value(name, id));
        let body = self.body(element, id, value.as_deref());

        self.out.push('<');
        self.out.push_str(name);
        self.attributes(element, &class_changes, value.as_deref().filter(|_| name == "input"));
        self.out.push('>');

        if !VOID_ELEMENTS.contains(&name) {
            match body {
                Body::Keep => self.children(element, RAW_TEXT_ELEMENTS.contains(&name)),
                Body::Text(text) => self.out.push_str(&escape_html(&text)),
                Body::Markup(markup) => self.out.push_str(&markup),
            }
            self.out.push_str("</");
            self.out.push_str(name);
            self.out.push('>');
        }

        self.current_form = enclosing_form;
    }

    /// Current value of an `input` or `textarea` owning this id.
    fn control_value(&self, name: &str, id: &str) -> Option<String> {
        if !matches!(name, "input" | "textarea") {
            return None;
        }
        match self.current_form {
            Some(index) => self
                .view
                .forms
                .get(index)?
                .field(id)
                .map(|field| field.value.clone()),
            None => self.view.inputs.get(id).cloned(),
        }
    }

    fn body(&self, element: ElementRef<'_>, id: Option<&str>, value: Option<&str>) -> Body {
        if element.value().name() == "textarea" {
            return value.map_or(Body::Keep, |value| Body::Text(value.to_string()));
        }
        let Some(id) = id else {
            return Body::Keep;
        };

        let group = self
            .current_form
            .and_then(|index| self.view.forms.get(index))
            .and_then(|form| form.multi_by_container(id));
        if let Some(group) = group {
            return Body::Markup(group.render());
        }

        match self.view.texts.get(id) {
            Some(text) if *text != element_text(element) => Body::Text(text.clone()),
            _ => Body::Keep,
        }
    }

    fn attributes(
        &mut self,
        element: ElementRef<'_>,
        class_changes: &[(&str, bool)],
        value: Option<&str>,
    ) {
        let mut wrote_class = false;
        let mut wrote_value = false;
        for (name, raw) in element.value().attrs() {
            let rendered = match name {
                "class" if !class_changes.is_empty() => {
                    wrote_class = true;
                    apply_class_changes(raw, class_changes)
                }
                "value" => match value {
                    Some(value) => {
                        wrote_value = true;
                        value.to_string()
                    }
                    None => raw.to_string(),
                },
                _ => raw.to_string(),
            };
            self.push_attribute(name, &rendered);
        }

        if !wrote_class {
            let classes = apply_class_changes("", class_changes);
            if !classes.is_empty() {
                self.push_attribute("class", &classes);
            }
        }
        if let Some(value) = value.filter(|_| !wrote_value) {
            self.push_attribute("value", value);
        }
    }

    fn push_attribute(&mut self, name: &str, value: &str) {
        self.out.push(' ');
        self.out.push_str(name);
        self.out.push_str("=\"");
        self.out.push_str(&escape_html(value));
        self.out.push('"');
    }
}

fn apply_class_changes<'a>(raw: &'a str, changes: &[(&'a str, bool)]) -> String {
    let mut classes: Vec<&str> = raw.split_whitespace().collect();
    for &(class, wanted) in changes {
        let present = classes.contains(&class);
        if wanted && !present {
            classes.push(class);
        } else if !wanted && present {
            classes.retain(|existing| *existing != class);
        }
    }
    classes.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_view_keeps_structure_and_values() {
        let source = r#"<p id="title">Lectures</p><input id="q" value="a &amp; b"><br>"#;
        let view = RegionView::parse(source);
        assert_eq!(
            project(source, &view),
            r#"<p id="title">Lectures</p><input id="q" value="a &amp; b"><br>"#
        );
    }

    #[test]
    fn changed_text_and_input_are_written_back() {
        let source = r#"<span id="count"> 0 </span><input id="q" type="text">"#;
        let mut view = RegionView::parse(source);
        view.texts.insert("count".into(), "3".into());
        view.inputs.insert("q".into(), "x<y".into());

        let html = project(source, &view);

        assert!(html.contains(r#"<span id="count">3</span>"#), "{html}");
        assert!(html.contains(r#"value="x&lt;y""#), "{html}");
    }

    #[test]
    fn row_marks_and_active_buttons_follow_the_view() {
        let source = r#"<div class="ok alert-success" id="r">1</div><div class="ok" id="s">2</div>
            <a class="ed-init active" href="/a">A</a><a class="ed-init" href="/b">B</a>"#;
        let mut view = RegionView::parse(source);
        view.ok_elements[0].marked = false;
        view.ok_elements[1].marked = true;
        view.init_buttons[0].active = false;
        view.init_buttons[1].active = true;

        let html = project(source, &view);

        assert!(html.contains(r#"<div class="ok" id="r">"#), "{html}");
        assert!(html.contains(r#"<div class="ok alert-success" id="s">"#), "{html}");
        assert!(html.contains(r#"<a class="ed-init" href="/a">"#), "{html}");
        assert!(html.contains(r#"<a class="ed-init active" href="/b">"#), "{html}");
    }

    #[test]
    fn duplicate_ids_only_project_the_first_element() {
        let source = r#"<b id="n">1</b><b id="n">1</b>"#;
        let mut view = RegionView::parse(source);
        view.texts.insert("n".into(), "2".into());

        assert_eq!(project(source, &view), r#"<b id="n">2</b><b id="n">1</b>"#);
    }
}
