//! Registration, login and password-reset handlers.
//!
//! Hospital registration and the slug lookup are control-plane endpoints and
//! bypass tenant resolution; everything else here runs against the tenant
//! store resolved by the middleware.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::jwt;
use crate::models::{Doctor, Hospital, HospitalStatus, User};
use crate::roles::ensure_default_roles;
use crate::state::AppState;
use crate::tenant::context::TenantContext;
use crate::tenant::directory::create_subdomain;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::{doc, oid::ObjectId};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalRegistrationDto {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupDto {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDto {
    pub user_id: String,
    pub medical_license_number: String,
    pub specialization: String,
    pub years_of_experience: u32,
}

#[derive(Debug, Deserialize)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordDto {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordDto {
    pub password: String,
    pub confirm_password: String,
    pub token: String,
}

fn hash_password(password: &str) -> Result<String, AppError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// `POST /auth/register-hospital` (tenant-exempt). Creates the tenant
/// directory record, then the hospital record pointing at it. The two writes
/// are not transactional; a failure between them leaves an orphaned tenant
/// record.
pub async fn register_hospital(
    State(state): State<AppState>,
    Json(dto): Json<HospitalRegistrationDto>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let subdomain = create_subdomain(&dto.name);
    let tenant = state.directory.create_tenant(&subdomain).await?;
    let tenant_id = tenant
        .id
        .ok_or_else(|| AppError::Internal("tenant record has no id".into()))?;

    let now = chrono::Utc::now();
    let hospital = Hospital {
        id: None,
        tenant_id,
        name: dto.name,
        subdomain: subdomain.clone(),
        email: dto.email,
        phone: None,
        address: None,
        website: None,
        admin_id: None,
        departments: Vec::new(),
        timezone: "UTC".into(),
        currency: "USD".into(),
        status: HospitalStatus::Active,
        created_at: now,
        updated_at: now,
    };
    let result = Hospital::collection(&state.core_db)
        .insert_one(&hospital)
        .await
        .map_err(|e| AppError::conflict_on_duplicate(e, "Hospital already exists"))?;
    let hospital_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Internal("hospital record has no id".into()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "hospital": {
                "_id": hospital_id.to_hex(),
                "tenantId": tenant_id.to_hex(),
                "subdomain": subdomain,
            },
            "message": "Hospital created successfully",
        })),
    ))
}

/// `POST /auth/register-admin`. First user of a fresh tenant store: creates
/// the account, seeds the default roles, assigns the first (Admin) role.
pub async fn register_admin(
    ctx: TenantContext,
    Json(dto): Json<SignupDto>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let users = ctx.users();
    let user = User {
        id: None,
        first_name: dto.first_name,
        last_name: dto.last_name,
        email: dto.email,
        password: hash_password(&dto.password)?,
        roles: Vec::new(),
    };
    let result = users
        .insert_one(&user)
        .await
        .map_err(|e| AppError::conflict_on_duplicate(e, "User already exists"))?;
    let user_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Internal("user record has no id".into()))?;

    let roles = ensure_default_roles(&ctx).await?;
    if let Some(admin_role) = roles.first().and_then(|r| r.id) {
        users
            .update_one(
                doc! { "_id": user_id },
                doc! { "$addToSet": { "roles": admin_role } },
            )
            .await?;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user": { "_id": user_id.to_hex() },
            "message": "Admin created successfully",
        })),
    ))
}

/// `POST /auth/signup`.
pub async fn signup(
    ctx: TenantContext,
    Json(dto): Json<SignupDto>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user = User {
        id: None,
        first_name: dto.first_name,
        last_name: dto.last_name,
        email: dto.email,
        password: hash_password(&dto.password)?,
        roles: Vec::new(),
    };
    let result = ctx
        .users()
        .insert_one(&user)
        .await
        .map_err(|e| AppError::conflict_on_duplicate(e, "User already exists"))?;
    let user_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Internal("user record has no id".into()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user": { "_id": user_id.to_hex() },
            "message": "User created successfully",
        })),
    ))
}

/// `POST /auth/register-doctor`. The doctor profile references an existing
/// user account in the same tenant store.
pub async fn register_doctor(
    ctx: TenantContext,
    Json(dto): Json<DoctorDto>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user_id = ObjectId::parse_str(&dto.user_id)
        .map_err(|_| AppError::NotFound("User does not exist".into()))?;
    ctx.users()
        .find_one(doc! { "_id": user_id })
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".into()))?;

    let doctor = Doctor {
        id: None,
        user_id,
        specialization: dto.specialization,
        medical_license_number: dto.medical_license_number,
        years_of_experience: dto.years_of_experience,
        clinic_address: None,
        phone_number: None,
    };
    let result = ctx
        .doctors()
        .insert_one(&doctor)
        .await
        .map_err(|e| AppError::conflict_on_duplicate(e, "Doctor already exists"))?;
    let doctor_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Internal("doctor record has no id".into()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "doctor": { "_id": doctor_id.to_hex() },
            "message": "Doctor created successfully",
        })),
    ))
}

/// `POST /auth/login`.
pub async fn login(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(dto): Json<LoginDto>,
) -> Result<Json<Value>, AppError> {
    let user = ctx
        .users()
        .find_one(doc! { "email": &dto.email })
        .await?
        .ok_or_else(|| AppError::Unauthorized("User does not exist".into()))?;

    let matched = bcrypt::verify(&dto.password, &user.password)
        .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))?;
    if !matched {
        return Err(AppError::Unauthorized("Password does not match".into()));
    }

    let user_id = user
        .id
        .ok_or_else(|| AppError::Internal("user record has no id".into()))?;
    let access_token = jwt::sign(
        &user_id.to_hex(),
        &state.config.jwt_secret,
        jwt::ACCESS_TOKEN_TTL,
    )?;

    Ok(Json(json!({
        "user": {
            "_id": user_id.to_hex(),
            "email": user.email,
            "accessToken": access_token,
        },
        "message": "User logged in successfully",
    })))
}

fn reset_link(config: &AppConfig, token: &str) -> String {
    format!("{}/auth/reset-password/{}", config.frontend_domain, token)
}

/// `POST /auth/forgot-password`. Issues a short-lived reset token and hands
/// the link to the mailer boundary.
pub async fn forgot_password(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(dto): Json<ForgotPasswordDto>,
) -> Result<Json<Value>, AppError> {
    ctx.users()
        .find_one(doc! { "email": &dto.email })
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".into()))?;

    let token = jwt::sign(&dto.email, &state.config.jwt_secret, jwt::RESET_TOKEN_TTL)?;
    let link = reset_link(&state.config, &token);
    state.mailer.send_reset_link(&dto.email, &link).await?;

    Ok(Json(json!({
        "message": "A password reset link has been sent to the provided email",
    })))
}

/// `POST /auth/reset-password`.
pub async fn reset_password(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(dto): Json<ResetPasswordDto>,
) -> Result<Json<Value>, AppError> {
    let claims = jwt::verify(&dto.token, &state.config.jwt_secret).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::BadRequest("Token expired".into())
            }
            _ => AppError::BadRequest("Invalid token".into()),
        }
    })?;

    if dto.password != dto.confirm_password {
        return Err(AppError::Unauthorized("Password does not match".into()));
    }

    let password = hash_password(&dto.password)?;
    let result = ctx
        .users()
        .update_one(
            doc! { "email": &claims.sub },
            doc! { "$set": { "password": password } },
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound("User does not exist".into()));
    }

    Ok(Json(json!({
        "message": "Password has been reset successfully",
    })))
}

/// `GET /auth/get-tenant-id/:subdomain` (tenant-exempt). Lets the frontend
/// discover the tenant id to send in `x-tenant-id`.
pub async fn get_tenant_id(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> Result<Json<Value>, AppError> {
    let tenant_id = state.directory.get_tenant_id(&subdomain).await?;
    Ok(Json(json!({
        "exists": true,
        "tenantId": tenant_id.to_hex(),
    })))
}
