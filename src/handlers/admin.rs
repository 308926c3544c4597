use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Collection;
use serde::Deserialize;
use serde_json::json;

use crate::errors::{AppError, Result};
use crate::handlers::auth::session_cookie;
use crate::models::admin::{Admin, AdminRole};
use crate::models::user::AccessClaims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

fn admin_json(admin: &Admin) -> serde_json::Value {
    json!({
        "id": admin.id.map(|id| id.to_hex()),
        "name": admin.name,
        "email": admin.email,
        "role": admin.role,
        "image": admin.image,
    })
}

pub async fn create_admin(
    State(state): State<AppState>,
    Json(payload): Json<CreateAdminRequest>,
) -> Result<impl IntoResponse> {
    if payload.name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
        || payload.confirm_password.is_empty()
    {
        return Err(AppError::validation("Please provide all required fields"));
    }
    if payload.password != payload.confirm_password {
        return Err(AppError::validation(
            "Password and confirm password do not match",
        ));
    }

    let collection: Collection<Admin> = state.db.collection("admins");
    let email = payload.email.trim().to_lowercase();

    if collection.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(AppError::conflict("Admin with this email already exists"));
    }

    let now = Utc::now();
    let mut admin = Admin {
        id: None,
        name: payload.name.trim().to_string(),
        email,
        password: state.auth.hasher().hash(&payload.password)?,
        role: AdminRole::Admin,
        image: None,
        refresh_token: None,
        created_at: now,
        updated_at: now,
    };

    let inserted = collection.insert_one(&admin).await?;
    admin.id = inserted.inserted_id.as_object_id();
    let id_hex = admin
        .id
        .map(|id| id.to_hex())
        .ok_or_else(|| AppError::internal("Insert returned no ObjectId"))?;

    let token = state
        .auth
        .tokens()
        .issue_access_token_for(&id_hex, &admin.email, "admin")?;
    let refresh_token = state.auth.tokens().issue_refresh_token_for(&id_hex, "admin")?;

    collection
        .update_one(
            doc! { "_id": admin.id },
            doc! { "$set": { "refreshToken": &refresh_token } },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Admin created successfully",
            "data": {
                "admin": admin_json(&admin),
                "token": token,
                "refreshToken": refresh_token,
            },
        })),
    ))
}

pub async fn admin_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Please provide email and password"));
    }

    let collection: Collection<Admin> = state.db.collection("admins");
    let email = payload.email.trim().to_lowercase();

    let admin = collection
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| AppError::authentication("Invalid credentials"))?;

    if !state.auth.hasher().verify(&payload.password, &admin.password)? {
        return Err(AppError::authentication("Invalid credentials"));
    }

    let id_hex = admin
        .id
        .map(|id| id.to_hex())
        .ok_or_else(|| AppError::internal("Admin has no id"))?;
    let role = match admin.role {
        AdminRole::Admin => "admin",
        AdminRole::SuperAdmin => "superAdmin",
    };

    let token = state
        .auth
        .tokens()
        .issue_access_token_for(&id_hex, &admin.email, role)?;
    let refresh_token = state.auth.tokens().issue_refresh_token_for(&id_hex, role)?;

    collection
        .update_one(
            doc! { "_id": admin.id },
            doc! { "$set": { "refreshToken": &refresh_token } },
        )
        .await?;

    let jar = jar.add(session_cookie("token", token.clone(), state.secure_cookies));

    Ok((
        jar,
        Json(json!({
            "success": true,
            "message": "Login successful",
            "data": {
                "admin": admin_json(&admin),
                "token": token,
                "refreshToken": refresh_token,
            },
        })),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<impl IntoResponse> {
    let collection: Collection<Admin> = state.db.collection("admins");
    let id = ObjectId::parse_str(&claims.sub)?;

    let admin = collection
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("Admin not found"))?;

    Ok(Json(json!({
        "success": true,
        "data": admin_json(&admin),
    })))
}
