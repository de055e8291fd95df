//! Map a record to the topics its notification is delivered to.

use safecity_core::records::Record;
use std::collections::BTreeSet;

use crate::types::Topic;

/// Resolve delivery targets. An empty set means the record cannot be
/// delivered and the handler must stop before touching the transport.
pub fn resolve_topics(record: &Record) -> BTreeSet<Topic> {
    let mut topics = BTreeSet::new();
    match record {
        Record::Incident(_) => {
            topics.insert(Topic::incidents());
        }
        Record::OfficialAlert(_) => {
            topics.insert(Topic::official_alerts());
        }
        Record::DirectNotification(direct) => {
            if let Some(recipient) = direct.recipient() {
                topics.insert(Topic::for_recipient(&recipient));
            }
        }
    }
    topics
}
