//! Tenant-local user account.

use crate::tenant::context::Entity;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Bcrypt hash.
    pub password: String,
    #[serde(default)]
    pub roles: Vec<ObjectId>,
}

impl Entity for User {
    const COLLECTION: &'static str = "users";
}
