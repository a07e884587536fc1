use poem_openapi::Object;

use crate::types::db::audit_entry;

#[derive(Object, Debug, Clone)]
pub struct AuditEntryData {
    pub id: i32,
    pub timestamp: String,
    pub actor_id: String,
    pub actor_name: String,
    pub action: String,
    pub entity_type: String,
    pub details: String,
}

impl From<audit_entry::Model> for AuditEntryData {
    fn from(model: audit_entry::Model) -> Self {
        Self {
            id: model.id,
            timestamp: model.timestamp,
            actor_id: model.actor_id,
            actor_name: model.actor_name,
            action: model.action,
            entity_type: model.entity_type,
            details: model.details,
        }
    }
}

#[derive(Object, Debug)]
pub struct AuditListEnvelope {
    pub success: bool,
    pub message: String,
    pub data: Vec<AuditEntryData>,
}

impl AuditListEnvelope {
    pub fn ok(message: impl Into<String>, data: Vec<AuditEntryData>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}
