//! Class names and element ids shared with the server-rendered page.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const MODAL_FRAGMENT_CLASS: &str = "modalFragment";
pub const FORM_CLASS: &str = "form";
pub const NAV_PILL_CLASS: &str = "navPills";
pub const NAV_ITEMS_CLASS: &str = "navItems";
pub const EDITOR_INIT_CLASS: &str = "ed-init";
pub const OK_CLASS: &str = "ok";
pub const ACTIVE_CLASS: &str = "active";
pub const SELECTED_MARKER_CLASS: &str = "alert-success";
pub const MODAL_TITLE_CLASS: &str = "modal-title";

pub const SECTION_TITLE_ID: &str = "sectionTitle";
pub const CONFIRMATION_MODAL_ID: &str = "confirmationModal";
pub const CONFIRMATION_LABEL_ID: &str = "confirmationLabel";
pub const CONFIRMATION_MESSAGE_ID: &str = "confirmationMessage";
pub const CONFIRMED_REFERENCE_ID: &str = "confirmedReference";

pub const SELECT_ID: &str = "selectId";
pub const SELECT_SUBJECT_ID: &str = "selectSubj";
pub const SELECT_FIRST_NAME_ID: &str = "selectFirstName";
pub const SELECT_LAST_NAME_ID: &str = "selectLastName";
pub const DATETIME_INPUT_ID: &str = "datetime-input";
/// Form group hidden when the editor is launched in "Create" mode.
pub const ENTITY_ID_GROUP: &str = "id";

pub const NAV_FRAGMENT_ID: &str = "fragNav";
pub const NAV_EDITOR_ID: &str = "editNav";
pub const OK_DATE_ID: &str = "dateOk";
pub const OK_COURSE_ID: &str = "courseOk";
pub const OK_TEACHER_ID: &str = "teacherOk";
pub const OK_STUDENT_ID: &str = "studentOk";

pub const HOVER_BACKGROUND: &str = "#a5a5a5";
pub const REST_BACKGROUND: &str = "#ffffff";

pub const DEFAULT_CONFIRMATION_MESSAGE: &str = "Do you with to continue?";
pub const DELETE_LABEL: &str = "DELETE";
pub const DELETE_BUTTON_TEXT: &str = "Delete";
pub const CREATE_MODE_TEXT: &str = "Create";
pub const ERROR_SECTION_TITLE: &str = "Error";
pub const ERROR_PANEL_IMAGE: &str = "img/thinking.jpg";

/// The three swappable regions of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    Fragment,
    Modal,
    Editor,
}

impl Container {
    pub const ALL: [Container; 3] = [Container::Fragment, Container::Modal, Container::Editor];

    pub fn class_name(self) -> &'static str {
        match self {
            Self::Fragment => "fragmentTarget",
            Self::Modal => "modalTarget",
            Self::Editor => "editorTarget",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// A single-valued field: one hidden input and one visible summary element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    pub input_id: &'static str,
    pub display_id: &'static str,
}

pub const DATE_FIELD: FieldBinding = FieldBinding {
    input_id: "form-date",
    display_id: "table-date",
};

pub const COURSE_FIELD: FieldBinding = FieldBinding {
    input_id: "form-courseId",
    display_id: "table-course",
};

pub const TEACHER_FIELD: FieldBinding = FieldBinding {
    input_id: "form-teacherId",
    display_id: "table-teacher",
};

/// A multi-valued field: zero or more hidden inputs sharing an id and a
/// name inside one container element, plus a summary showing the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiFieldBinding {
    pub container_id: &'static str,
    pub input_id: &'static str,
    pub name: &'static str,
    pub display_id: &'static str,
}

pub const STUDENTS_FIELD: MultiFieldBinding = MultiFieldBinding {
    container_id: "form-students",
    input_id: "form-studentId",
    name: "studentId",
    display_id: "table-students",
};

pub const MULTI_FIELDS: [MultiFieldBinding; 1] = [STUDENTS_FIELD];
