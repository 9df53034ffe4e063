//! Hospital management (control plane). These routes are exempt from tenant
//! resolution: they operate on the central database and, for deletion, on the
//! tenant's whole store rather than data inside it.

use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::models::{Department, Hospital, HospitalStatus};
use crate::state::AppState;
use crate::tenant::decommission_tenant;
use axum::{
    extract::{Path, State},
    Json,
};
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use mongodb::options::ReturnDocument;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalUpdateDto {
    pub tenant_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub admin_id: Option<String>,
    pub departments: Option<Vec<Department>>,
    pub timezone: Option<String>,
    pub currency: Option<String>,
    pub status: Option<HospitalStatus>,
}

impl HospitalUpdateDto {
    fn into_set_document(self) -> Result<Document, AppError> {
        let mut set = doc! { "updatedAt": bson::DateTime::now() };
        if let Some(name) = self.name {
            set.insert("name", name);
        }
        if let Some(email) = self.email {
            set.insert("email", email);
        }
        if let Some(phone) = self.phone {
            set.insert("phone", phone);
        }
        if let Some(address) = self.address {
            set.insert("address", address);
        }
        if let Some(website) = self.website {
            set.insert("website", website);
        }
        if let Some(admin_id) = self.admin_id {
            let oid = ObjectId::parse_str(&admin_id)
                .map_err(|_| AppError::BadRequest("Invalid admin id".into()))?;
            set.insert("adminId", oid);
        }
        if let Some(departments) = self.departments {
            set.insert(
                "departments",
                bson::to_bson(&departments)
                    .map_err(|e| AppError::BadRequest(format!("Invalid departments: {}", e)))?,
            );
        }
        if let Some(timezone) = self.timezone {
            set.insert("timezone", timezone);
        }
        if let Some(currency) = self.currency {
            set.insert("currency", currency);
        }
        if let Some(status) = self.status {
            set.insert(
                "status",
                bson::to_bson(&status)
                    .map_err(|e| AppError::BadRequest(format!("Invalid status: {}", e)))?,
            );
        }
        Ok(set)
    }
}

/// `PATCH /hospitals/:id`.
pub async fn update_hospital(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
    Json(dto): Json<HospitalUpdateDto>,
) -> Result<Json<Hospital>, AppError> {
    let hospitals = Hospital::collection(&state.core_db);

    let tenant_id = ObjectId::parse_str(&dto.tenant_id)
        .map_err(|_| AppError::NotFound("Hospital not found".into()))?;
    hospitals
        .find_one(doc! { "tenantId": tenant_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Hospital not found".into()))?;

    let hospital_id = ObjectId::parse_str(&id)
        .map_err(|_| AppError::NotFound("Hospital not found".into()))?;
    let set = dto.into_set_document()?;
    let updated = hospitals
        .find_one_and_update(doc! { "_id": hospital_id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("Hospital not found".into()))?;

    Ok(Json(updated))
}

/// `DELETE /hospitals/:tenant_id/:hospital_id`. Removes the tenant completely
/// via [`decommission_tenant`]: directory record, pooled connection, physical
/// database, hospital record.
pub async fn delete_hospital(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((tenant_id, hospital_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let hospital_oid = ObjectId::parse_str(&hospital_id)
        .map_err(|_| AppError::NotFound("Hospital not found".into()))?;

    decommission_tenant(&state, state.pool.as_ref(), &tenant_id, hospital_oid).await?;

    Ok(Json(json!({
        "tenantId": tenant_id,
        "hospitalId": hospital_id,
        "message": "Hospital deleted successfully",
    })))
}
