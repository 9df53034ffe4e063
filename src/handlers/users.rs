//! Tenant user listing.

use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::models::User;
use crate::tenant::context::TenantContext;
use axum::Json;
use futures::TryStreamExt;
use mongodb::bson::doc;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        UserSummary {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            roles: user.roles.iter().map(|r| r.to_hex()).collect(),
        }
    }
}

/// `GET /users`. Lists the accounts of the requesting tenant only; isolation
/// comes from the context's connection, not from a filter.
pub async fn get_users(
    _auth: AuthUser,
    ctx: TenantContext,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let users: Vec<User> = ctx.users().find(doc! {}).await?.try_collect().await?;
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}
