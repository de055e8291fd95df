pub mod builder;
pub mod error;
pub mod handler;
pub mod journal;
pub mod registry;
pub mod resolver;
pub mod transport;
pub mod types;

pub use builder::*;
pub use error::*;
pub use handler::*;
pub use journal::*;
pub use registry::*;
pub use resolver::*;
pub use transport::*;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::{
        build_payload, resolve_topics, DeliveryTransport, DispatchHandler, DispatchReport,
        FailedDelivery, FcmTransport, HandlerRegistry, NotificationPayload, ReplayJournal,
        RouteError, StdoutTransport, Topic, TransportError, WebhookTransport,
    };
    use safecity_core::records::Record;
    use safecity_core::types::DocumentId;
    use std::any::TypeId;
    use std::collections::BTreeSet;

    #[test]
    fn crate_root_reexports_types() {
        let _ = TypeId::of::<Topic>();
        let _ = TypeId::of::<NotificationPayload>();
        let _ = TypeId::of::<TransportError>();
        let _ = TypeId::of::<RouteError>();
        let _ = TypeId::of::<DispatchHandler>();
        let _ = TypeId::of::<DispatchReport>();
        let _ = TypeId::of::<HandlerRegistry>();
        let _ = TypeId::of::<ReplayJournal>();
        let _ = TypeId::of::<FailedDelivery>();
        let _ = TypeId::of::<StdoutTransport>();
        let _ = TypeId::of::<FcmTransport>();
        let _ = TypeId::of::<WebhookTransport>();
        let _ = TypeId::of::<Box<dyn DeliveryTransport>>();
    }

    #[test]
    fn crate_root_reexports_pure_helpers() {
        let _builder: fn(&Record, &DocumentId) -> NotificationPayload = build_payload;
        let _resolver: fn(&Record) -> BTreeSet<Topic> = resolve_topics;
    }
}
