//! Tenant-local role with string capability tags.

use crate::tenant::context::Entity;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Role {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Entity for Role {
    const COLLECTION: &'static str = "roles";
}
