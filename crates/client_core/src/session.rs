use std::sync::Arc;

use shared::protocol::Method;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    binder::{BindError, ElementHandle, EventBinder, Hover, NavRoute},
    markup::NavPill,
    sync::SyncOutcome,
    FragmentClient, LoadOutcome,
};

/// A loaded page: the fragment client plus the handlers bound to it.
///
/// Lock order is binder first, then document; neither is held across a
/// request.
pub struct PageSession {
    client: Arc<FragmentClient>,
    binder: Mutex<EventBinder>,
}

impl PageSession {
    pub fn new(client: Arc<FragmentClient>) -> Result<Self, BindError> {
        Ok(Self::with_binder(client, EventBinder::with_default_routes()?))
    }

    pub fn with_binder(client: Arc<FragmentClient>, binder: EventBinder) -> Self {
        Self {
            client,
            binder: Mutex::new(binder),
        }
    }

    pub fn client(&self) -> &Arc<FragmentClient> {
        &self.client
    }

    pub async fn init_nav_listeners(&self, layout_html: &str) -> usize {
        self.binder.lock().await.init_nav_listeners(layout_html)
    }

    pub async fn nav_pills(&self) -> Vec<NavPill> {
        self.binder.lock().await.nav_pills().to_vec()
    }

    pub async fn click_nav(&self, index: usize) -> LoadOutcome {
        let command = self.binder.lock().await.nav_click(index);
        let Some(command) = command else {
            return LoadOutcome::Skipped;
        };

        let outcome = match command.route {
            NavRoute::Fragment => {
                self.client
                    .request_url(&command.href, Method::Get, None)
                    .await
            }
            NavRoute::Editor => {
                self.client
                    .request_editor(&command.href, Method::Get, None)
                    .await
            }
        };
        self.rebind_after(outcome).await;
        outcome
    }

    pub async fn hover_nav(&self, index: usize, hover: Hover) -> Option<String> {
        self.binder
            .lock()
            .await
            .nav_hover(index, hover)
            .map(str::to_string)
    }

    pub async fn init_editor_listeners(&self) -> u64 {
        let mut binder = self.binder.lock().await;
        let doc = self.client.document().await;
        binder.init_editor_listeners(&doc)
    }

    pub async fn init_handles(&self) -> Vec<ElementHandle> {
        self.binder.lock().await.init_handles().to_vec()
    }

    pub async fn ok_handles(&self) -> Vec<ElementHandle> {
        self.binder.lock().await.ok_handles().to_vec()
    }

    pub async fn click_editor_init(&self, handle: ElementHandle) -> LoadOutcome {
        let href = {
            let binder = self.binder.lock().await;
            let mut doc = self.client.document().await;
            binder.editor_init_click(&mut doc, handle)
        };
        let Some(href) = href else {
            return LoadOutcome::Skipped;
        };

        let outcome = self.client.request_editor(&href, Method::Get, None).await;
        self.rebind_after(outcome).await;
        outcome
    }

    pub async fn click_ok(&self, handle: ElementHandle) -> Option<SyncOutcome> {
        let binder = self.binder.lock().await;
        let mut doc = self.client.document().await;
        binder.ok_click(&mut doc, handle)
    }

    pub async fn submit_form(&self) -> LoadOutcome {
        let outcome = self.client.submit_form(None).await;
        self.rebind_after(outcome).await;
        outcome
    }

    pub async fn confirm(&self) -> LoadOutcome {
        let outcome = self.client.confirm().await;
        self.rebind_after(outcome).await;
        outcome
    }

    /// Injected markup replaced the bound elements; bind the new ones.
    async fn rebind_after(&self, outcome: LoadOutcome) {
        if let LoadOutcome::Injected(container) = outcome {
            let binding = self.init_editor_listeners().await;
            debug!(binding, "listeners rebound after {container} load");
        }
    }
}
