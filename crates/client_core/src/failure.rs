use std::sync::Mutex;

use chrono::{DateTime, Utc};
use shared::{
    error::RequestFailure,
    markup::{Container, ERROR_PANEL_IMAGE, ERROR_SECTION_TITLE},
};
use tracing::warn;

use crate::{document::Document, markup::escape_html};

/// Where failed requests are reported. Called with the document locked.
pub trait FailureSink: Send + Sync {
    fn report(&self, document: &mut Document, failure: &RequestFailure);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub at: DateTime<Utc>,
    pub failure: RequestFailure,
}

/// Replaces the page fragment with an error panel and titles the section
/// `Error`.
#[derive(Default)]
pub struct ErrorPanelSink {
    history: Mutex<Vec<FailureRecord>>,
}

impl ErrorPanelSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<FailureRecord> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }
}

impl FailureSink for ErrorPanelSink {
    fn report(&self, document: &mut Document, failure: &RequestFailure) {
        warn!(
            status = failure.status,
            url = %failure.url,
            "fragment request failed: {}",
            failure.description
        );
        document.set_section_title(ERROR_SECTION_TITLE);
        document.replace_content(Container::Fragment, render_error_panel(failure));

        if let Ok(mut history) = self.history.lock() {
            history.push(FailureRecord {
                at: Utc::now(),
                failure: failure.clone(),
            });
        }
    }
}

/// Only logs; leaves every container as it was.
pub struct LogOnlySink;

impl FailureSink for LogOnlySink {
    fn report(&self, _document: &mut Document, failure: &RequestFailure) {
        warn!(
            status = failure.status,
            url = %failure.url,
            "fragment request failed: {}",
            failure.description
        );
    }
}

pub fn render_error_panel(failure: &RequestFailure) -> String {
    format!(
        "<div class=\"container text-center\">\
         <p class=\"text-warning h1\">{} {}</p><br />\
         <p class=\"text-danger h3\">Request failed: {} {}<br /><br />\
         <img class=\"img-fluid\" alt=\"thinking\" src=\"{}\"></img></p></div>",
        failure.status,
        escape_html(&failure.status_text),
        escape_html(&failure.url),
        escape_html(&failure.description),
        ERROR_PANEL_IMAGE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_shows_status_url_and_description() {
        let panel = render_error_panel(&RequestFailure::new(
            500,
            "Internal Server Error",
            "http://localhost/lectures",
            "Internal Server Error",
        ));
        assert!(panel.contains(">500 Internal Server Error</p>"));
        assert!(panel.contains("Request failed: http://localhost/lectures Internal Server Error"));
        assert!(panel.contains("img/thinking.jpg"));
    }

    #[test]
    fn error_panel_sink_replaces_fragment_and_records() {
        let sink = ErrorPanelSink::new();
        let mut doc = Document::new();
        doc.replace_content(Container::Editor, "<p>editor</p>");

        sink.report(&mut doc, &RequestFailure::new(404, "Not Found", "/x", "Not Found"));

        assert!(doc.content(Container::Fragment).contains("404 Not Found"));
        assert_eq!(doc.content(Container::Editor), "<p>editor</p>");
        assert_eq!(doc.section_title(), Some("Error"));
        assert_eq!(sink.history().len(), 1);
    }

    #[test]
    fn log_only_sink_leaves_document_alone() {
        let mut doc = Document::new();
        doc.replace_content(Container::Fragment, "<p>page</p>");
        LogOnlySink.report(&mut doc, &RequestFailure::new(0, "timeout", "/x", "timeout"));
        assert_eq!(doc.content(Container::Fragment), "<p>page</p>");
    }
}
