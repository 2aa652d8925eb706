//! Routines that copy a picker selection back into the main form.
//!
//! Each `select_*` routine has the [`crate::binder::OkHandler`] shape so it
//! can be registered directly in the `ok` dispatch table.

use shared::markup::{
    COURSE_FIELD, DATE_FIELD, DATETIME_INPUT_ID, SELECT_FIRST_NAME_ID, SELECT_LAST_NAME_ID,
    SELECT_SUBJECT_ID, STUDENTS_FIELD, TEACHER_FIELD,
};
use tracing::{debug, warn};

use crate::{
    document::{Document, MarkingPass},
    form::Toggle,
    markup::OkElement,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Updated { value: String },
    Toggled { value: String, toggle: Toggle, count: usize },
    /// Something the routine needed was not on the page.
    Skipped,
}

pub fn replace_form_value(doc: &mut Document, input_id: &str, value: &str) -> bool {
    let replaced = doc
        .update_form(|form| form.replace_value(input_id, value))
        .unwrap_or(false);
    if !replaced {
        warn!("form input #{input_id} not found; value ignored");
    }
    replaced
}

pub fn replace_text(doc: &mut Document, element_id: &str, text: &str) -> bool {
    let replaced = doc.set_text(element_id, text);
    if !replaced {
        warn!("element #{element_id} not found; text ignored");
    }
    replaced
}

pub fn form_values_by_id(doc: &Document, input_id: &str) -> Vec<String> {
    doc.form()
        .map(|form| form.values_by_id(input_id))
        .unwrap_or_default()
}

pub fn mark_editor_rows(doc: &mut Document, selected: &[String]) -> MarkingPass {
    let pass = doc.mark_editor_rows(selected);
    debug!(
        marked = pass.marked,
        unmarked = pass.unmarked,
        "editor rows re-marked"
    );
    pass
}

pub fn select_date(doc: &mut Document, _source: &OkElement) -> SyncOutcome {
    let Some(value) = doc.input_value(DATETIME_INPUT_ID).map(str::to_string) else {
        warn!("#{DATETIME_INPUT_ID} not found; date selection ignored");
        return SyncOutcome::Skipped;
    };

    replace_form_value(doc, DATE_FIELD.input_id, &value);
    replace_text(doc, DATE_FIELD.display_id, &value.replace('T', " "));
    SyncOutcome::Updated { value }
}

pub fn select_course(doc: &mut Document, source: &OkElement) -> SyncOutcome {
    let Some(id) = source.select_id().map(str::to_string) else {
        warn!("course row without identifier; selection ignored");
        return SyncOutcome::Skipped;
    };
    let subject = source.cell(SELECT_SUBJECT_ID).unwrap_or_default().to_string();

    replace_form_value(doc, COURSE_FIELD.input_id, &id);
    replace_text(doc, COURSE_FIELD.display_id, &subject);
    let selected = form_values_by_id(doc, COURSE_FIELD.input_id);
    mark_editor_rows(doc, &selected);
    SyncOutcome::Updated { value: id }
}

pub fn select_teacher(doc: &mut Document, source: &OkElement) -> SyncOutcome {
    let Some(id) = source.select_id().map(str::to_string) else {
        warn!("teacher row without identifier; selection ignored");
        return SyncOutcome::Skipped;
    };
    let full_name = format!(
        "{} {}",
        source.cell(SELECT_FIRST_NAME_ID).unwrap_or_default(),
        source.cell(SELECT_LAST_NAME_ID).unwrap_or_default()
    );

    replace_form_value(doc, TEACHER_FIELD.input_id, &id);
    replace_text(doc, TEACHER_FIELD.display_id, &full_name);
    let selected = form_values_by_id(doc, TEACHER_FIELD.input_id);
    mark_editor_rows(doc, &selected);
    SyncOutcome::Updated { value: id }
}

/// Adds the row's student when the row is unmarked, removes it otherwise,
/// then re-marks the rows and refreshes the count.
pub fn toggle_student(doc: &mut Document, source: &OkElement) -> SyncOutcome {
    let Some(id) = source.select_id().map(str::to_string) else {
        warn!("student row without identifier; selection ignored");
        return SyncOutcome::Skipped;
    };

    let toggle = doc
        .update_form(|form| form.toggle(STUDENTS_FIELD.input_id, &id, source.marked))
        .flatten();
    let Some(toggle) = toggle else {
        warn!(
            "#{} not found; student selection ignored",
            STUDENTS_FIELD.container_id
        );
        return SyncOutcome::Skipped;
    };

    let selected = form_values_by_id(doc, STUDENTS_FIELD.input_id);
    mark_editor_rows(doc, &selected);
    replace_text(doc, STUDENTS_FIELD.display_id, &selected.len().to_string());
    SyncOutcome::Toggled {
        value: id,
        toggle,
        count: selected.len(),
    }
}
