use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use serde::{Deserialize, Serialize};
use shared::{
    error::{RequestFailure, TransportError},
    markup::{
        Container, CREATE_MODE_TEXT, DEFAULT_CONFIRMATION_MESSAGE, DELETE_BUTTON_TEXT,
        DELETE_LABEL, ENTITY_ID_GROUP,
    },
    protocol::{FragmentRequest, Method},
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use url::Url;

pub mod binder;
pub mod document;
pub mod failure;
pub mod form;
pub mod markup;
pub mod render;
pub mod session;
pub mod sync;
pub mod transport;

pub use binder::{BindError, ElementHandle, EventBinder, Hover, NavCommand, NavRoute};
pub use document::Document;
pub use failure::{ErrorPanelSink, FailureSink, LogOnlySink};
pub use session::PageSession;
pub use transport::{FragmentTransport, HttpTransport};

/// Runs once, right after a successful injection, with the document still
/// locked.
pub type Completion = Box<dyn FnOnce(&mut Document) + Send>;

/// What happens to a response that completes after a newer request
/// already filled the same container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    #[default]
    DiscardStale,
    LastCompletionWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Injected(Container),
    /// Reported through the failure sink.
    Failed,
    /// A newer response already owns the target container.
    Superseded,
    /// Nothing to send.
    Skipped,
}

#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Relative fragment URLs are resolved against this.
    pub base_url: Option<Url>,
    pub stale_policy: StalePolicy,
}

pub struct FragmentClient {
    transport: Arc<dyn FragmentTransport>,
    failure_sink: Arc<dyn FailureSink>,
    document: Mutex<Document>,
    options: ClientOptions,
    tickets: AtomicU64,
}

impl FragmentClient {
    pub fn new(transport: Arc<dyn FragmentTransport>, options: ClientOptions) -> Arc<Self> {
        Self::new_with_dependencies(
            transport,
            Arc::new(ErrorPanelSink::new()),
            options,
            Document::new(),
        )
    }

    pub fn new_with_dependencies(
        transport: Arc<dyn FragmentTransport>,
        failure_sink: Arc<dyn FailureSink>,
        options: ClientOptions,
        document: Document,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            failure_sink,
            document: Mutex::new(document),
            options,
            tickets: AtomicU64::new(0),
        })
    }

    pub async fn document(&self) -> MutexGuard<'_, Document> {
        self.document.lock().await
    }

    pub async fn snapshot(&self) -> Document {
        self.document.lock().await.clone()
    }

    pub fn resolve_url(&self, url: &str) -> Result<String, TransportError> {
        let resolved = match &self.options.base_url {
            Some(base) => base.join(url),
            None => Url::parse(url),
        };
        resolved
            .map(String::from)
            .map_err(|err| TransportError::InvalidUrl {
                url: url.to_string(),
                message: err.to_string(),
            })
    }

    /// Loads a fragment into the page container, or into the modal
    /// container when the response carries a modal marker anywhere.
    pub async fn request_url(
        &self,
        url: &str,
        method: Method,
        on_complete: Option<Completion>,
    ) -> LoadOutcome {
        info!("url requested: {url}, using method: {method}");
        let resolved = match self.resolve_url(url) {
            Ok(resolved) => resolved,
            Err(err) => return self.fail(&err).await,
        };
        let request = FragmentRequest::with_method(resolved, method);
        self.load_classified(request, Container::Fragment, on_complete)
            .await
    }

    /// Loads a fragment straight into the editor container.
    pub async fn request_editor(
        &self,
        url: &str,
        method: Method,
        on_complete: Option<Completion>,
    ) -> LoadOutcome {
        info!("editor requested: {url}, using method: {method}");
        let resolved = match self.resolve_url(url) {
            Ok(resolved) => resolved,
            Err(err) => return self.fail(&err).await,
        };
        let ticket = self.next_ticket();
        let body = match self
            .transport
            .send(FragmentRequest::with_method(resolved, method))
            .await
        {
            Ok(response) => response.body,
            Err(err) => return self.fail(&err).await,
        };

        let mut doc = self.document.lock().await;
        self.apply(&mut doc, ticket, Container::Editor, body, on_complete)
    }

    /// POSTs the page's `.form` to its action. Page responses go to
    /// `response_target` (the page container by default).
    pub async fn submit_form(&self, response_target: Option<Container>) -> LoadOutcome {
        let (action, pairs) = {
            let doc = self.document.lock().await;
            let Some(form) = doc.form() else {
                warn!("no .form on the page; submit ignored");
                return LoadOutcome::Skipped;
            };
            if doc.form_count() > 1 {
                warn!(
                    count = doc.form_count(),
                    "several .form elements on the page; submitting the first"
                );
            }
            let Some(action) = form.action().map(str::to_string) else {
                warn!(".form has no action; submit ignored");
                return LoadOutcome::Skipped;
            };
            (action, form.serialize_pairs())
        };

        info!("submitting form to {action} ({} fields)", pairs.len());
        let resolved = match self.resolve_url(&action) {
            Ok(resolved) => resolved,
            Err(err) => return self.fail(&err).await,
        };
        self.load_classified(
            FragmentRequest::post_form(resolved, pairs),
            response_target.unwrap_or(Container::Fragment),
            None,
        )
        .await
    }

    pub async fn set_section_title(&self, title: &str) {
        self.document.lock().await.set_section_title(title);
    }

    pub async fn request_section(&self, url: &str, title: &str) -> LoadOutcome {
        self.set_section_title(title).await;
        self.request_url(url, Method::Get, None).await
    }

    /// Loads an entity editor into the modal, titled after the element
    /// that launched it. In create mode the entity id group is hidden.
    pub async fn launch_editor(&self, element_text: &str, url: &str, method: Method) -> LoadOutcome {
        let text = element_text.to_string();
        let on_complete: Completion = Box::new(move |doc: &mut Document| {
            let modal = doc.modal_mut();
            if text == CREATE_MODE_TEXT {
                modal.hidden_groups.insert(ENTITY_ID_GROUP.to_string());
            }
            modal.title = Some(text);
            modal.open = true;
        });
        self.request_url(url, method, Some(on_complete)).await
    }

    /// Arms the confirmation dialog with a POST to `url` and shows it.
    /// Nothing is sent until [`Self::confirm`].
    pub async fn request_delete(&self, url: &str, message: Option<&str>) {
        let mut doc = self.document.lock().await;
        let dialog = doc.confirmation_mut();
        dialog.action = Some(document::PendingAction {
            url: url.to_string(),
            method: Method::Post,
        });
        dialog.confirm_text = DELETE_BUTTON_TEXT.to_string();
        dialog.label = DELETE_LABEL.to_string();
        dialog.message = message.unwrap_or(DEFAULT_CONFIRMATION_MESSAGE).to_string();
        dialog.open = true;
    }

    pub async fn confirm(&self) -> LoadOutcome {
        let action = {
            let mut doc = self.document.lock().await;
            let dialog = doc.confirmation_mut();
            dialog.open = false;
            dialog.action.clone()
        };
        match action {
            Some(action) => self.request_url(&action.url, action.method, None).await,
            None => {
                warn!("confirmation has no pending action");
                LoadOutcome::Skipped
            }
        }
    }

    pub async fn dismiss_confirmation(&self) {
        self.document.lock().await.confirmation_mut().open = false;
    }

    pub async fn replace_location(&self, url: &str) {
        self.document.lock().await.replace_location(url);
    }

    pub async fn remove_nav_elements(&self) {
        self.document.lock().await.remove_nav_elements();
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn load_classified(
        &self,
        request: FragmentRequest,
        page_target: Container,
        on_complete: Option<Completion>,
    ) -> LoadOutcome {
        let ticket = self.next_ticket();
        let body = match self.transport.send(request).await {
            Ok(response) => response.body,
            Err(err) => return self.fail(&err).await,
        };

        let marker = markup::find_modal_marker(&body);
        debug!(index = marker.index(), "modal marker lookup");
        let target = if marker.is_present() {
            Container::Modal
        } else {
            page_target
        };

        let mut doc = self.document.lock().await;
        self.apply(&mut doc, ticket, target, body, on_complete)
    }

    fn apply(
        &self,
        doc: &mut Document,
        ticket: u64,
        target: Container,
        body: String,
        on_complete: Option<Completion>,
    ) -> LoadOutcome {
        if self.options.stale_policy == StalePolicy::DiscardStale
            && doc.generation(target) > ticket
        {
            debug!(
                ticket,
                current = doc.generation(target),
                "stale response for {target} discarded"
            );
            return LoadOutcome::Superseded;
        }

        doc.inject(target, body, ticket);
        if let Some(on_complete) = on_complete {
            on_complete(doc);
        }
        LoadOutcome::Injected(target)
    }

    async fn fail(&self, err: &TransportError) -> LoadOutcome {
        let failure = RequestFailure::from(err);
        let mut doc = self.document.lock().await;
        self.failure_sink.report(&mut doc, &failure);
        LoadOutcome::Failed
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
