//! Control-plane hospital record (the tenant's owning business entity).
//! Lives on the central database, keyed independently of the tenant
//! directory record it is created alongside.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HospitalStatus {
    Active,
    Inactive,
    Suspended,
}

impl Default for HospitalStatus {
    fn default() -> Self {
        HospitalStatus::Active
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Tenant directory record this hospital owns. Unique-indexed.
    pub tenant_id: ObjectId,
    pub name: String,
    pub subdomain: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<ObjectId>,
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub status: HospitalStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_timezone() -> String {
    "UTC".into()
}

fn default_currency() -> String {
    "USD".into()
}

impl Hospital {
    /// Collection name on the central database.
    pub const COLLECTION: &'static str = "hospitals";

    pub fn collection(db: &mongodb::Database) -> mongodb::Collection<Hospital> {
        db.collection(Self::COLLECTION)
    }
}
