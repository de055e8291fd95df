use safecity_core::config::AndroidConfig;
use safecity_core::event::{CreationEvent, DocumentEvent, PathParams, PatternError};
use safecity_core::types::RecordKind;
use std::sync::Arc;

use crate::error::RouteError;
use crate::handler::{DispatchHandler, DispatchReport};
use crate::journal::ReplayJournal;
use crate::transport::DeliveryTransport;
use crate::types::DeliveryOptions;

/// Routes document-creation events to the handler whose trigger matches.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: Vec<DispatchHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three collection handlers sharing one transport.
    pub fn standard(
        transport: Arc<dyn DeliveryTransport>,
        android: &AndroidConfig,
        journal: Option<Arc<ReplayJournal>>,
    ) -> Result<Self, PatternError> {
        let options = DeliveryOptions::from_android(android);
        let mut registry = Self::new();
        for kind in RecordKind::ALL {
            let mut handler = DispatchHandler::new(kind, transport.clone(), options.clone())?;
            if let Some(journal) = &journal {
                handler = handler.with_journal(journal.clone());
            }
            registry.register(handler);
        }
        Ok(registry)
    }

    /// Later registrations never shadow earlier ones for the same path.
    pub fn register(&mut self, handler: DispatchHandler) {
        self.handlers.push(handler);
    }

    pub fn kinds(&self) -> Vec<RecordKind> {
        self.handlers.iter().map(DispatchHandler::kind).collect()
    }

    pub fn route(&self, document: &str) -> Option<(&DispatchHandler, PathParams)> {
        self.handlers.iter().find_map(|handler| {
            handler
                .trigger()
                .matches(document)
                .map(|params| (handler, params))
        })
    }

    pub async fn dispatch(&self, event: DocumentEvent) -> Result<DispatchReport, RouteError> {
        let Some((handler, params)) = self.route(&event.document) else {
            tracing::warn!(document = %event.document, "no handler for document");
            return Err(RouteError::UnknownCollection {
                document: event.document,
            });
        };
        Ok(handler.handle(CreationEvent::routed(event, params)).await)
    }
}
