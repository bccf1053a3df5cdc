use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    pub fn new(owner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            updated_at: Utc::now(),
        }
    }

    pub fn reassign(&mut self, new_owner: Uuid) {
        self.owner_id = new_owner;
        self.updated_at = Utc::now();
    }
}

/// Audit entry written each time ownership of a property changes hands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: Uuid,
    pub property_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl PropertyRecord {
    pub fn new(property_id: Uuid, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            property_id,
            user_id,
            created_at: Utc::now(),
        }
    }
}
