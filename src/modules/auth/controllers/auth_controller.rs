//! `/auth` endpoints.
//!
//! Only `me` does real work: it echoes the identity the auth middleware
//! attached. Login, registration and logout answer 501 until an account
//! store exists.

use std::sync::Arc;

use http::StatusCode;
use serde_json::json;

use crate::controller::{Controller, Methods};
use crate::discovery::{LoadResult, ModuleScope};
use crate::error::HttpError;
use crate::middleware::auth::Authenticator;
use crate::registry::DocMetadata;
use crate::request::Request;
use crate::response::{Json, Response};
use crate::token::AuthenticatedPrincipal;

pub struct AuthController;

impl AuthController {
    async fn login(self: Arc<Self>, _req: Request) -> Result<Response, HttpError> {
        Ok(not_implemented())
    }

    async fn register(self: Arc<Self>, _req: Request) -> Result<Response, HttpError> {
        Ok(not_implemented())
    }

    async fn logout(self: Arc<Self>, _req: Request) -> Result<Response, HttpError> {
        Ok(not_implemented())
    }

    async fn me(self: Arc<Self>, req: Request) -> Result<Json<AuthenticatedPrincipal>, HttpError> {
        let principal = req.principal().ok_or_else(|| HttpError::unauthorized("Unauthorized"))?;
        Ok(Json(principal.clone()))
    }
}

fn not_implemented() -> Response {
    Response::builder()
        .status(StatusCode::NOT_IMPLEMENTED)
        .json(&json!({ "error": "Not implemented" }))
}

impl Controller for AuthController {
    fn create() -> Self {
        AuthController
    }

    fn methods() -> Methods<Self> {
        Methods::new()
            .method("login", Self::login)
            .method("register", Self::register)
            .method("logout", Self::logout)
            .method("me", Self::me)
    }
}

pub fn load(scope: &mut ModuleScope<'_>) -> LoadResult {
    let auth = scope.require::<Authenticator>()?.clone();
    let credentials = json!({
        "type": "object",
        "properties": {
            "email": { "type": "string", "format": "email" },
            "password": { "type": "string", "minLength": 8 },
        },
        "required": ["email", "password"],
    });

    let registry = scope.registry();
    registry.declare_controller::<AuthController>("/auth");

    registry.declare_route::<AuthController>("login", "post", "/login", vec![])?;
    registry.document::<AuthController>(
        "login",
        DocMetadata::new()
            .summary("User login")
            .description("Authenticate with email and password, returning the user profile and a session cookie.")
            .tag("Auth")
            .operation_id("login")
            .body(credentials.clone())
            .response(200, "Login successful")
            .response(400, "Validation error")
            .response(401, "Invalid credentials"),
    );

    registry.declare_route::<AuthController>("register", "post", "/register", vec![])?;
    registry.document::<AuthController>(
        "register",
        DocMetadata::new()
            .summary("Register user")
            .description("Create a user account and start an authenticated session.")
            .tag("Auth")
            .operation_id("register")
            .body(credentials)
            .response(201, "Registration successful")
            .response(400, "Validation error")
            .response(409, "Email already registered"),
    );

    registry.declare_route::<AuthController>("logout", "post", "/logout", vec![auth.required()])?;
    registry.document::<AuthController>(
        "logout",
        DocMetadata::new()
            .summary("Logout user")
            .description("Invalidate the active session cookie.")
            .tag("Auth")
            .operation_id("logout")
            .response(200, "Logout successful")
            .response(401, "Authentication required"),
    );

    registry.declare_route::<AuthController>("me", "get", "/me", vec![auth.required()])?;
    registry.document::<AuthController>(
        "me",
        DocMetadata::new()
            .summary("Get current user")
            .description("Return the authenticated user profile.")
            .tag("Auth")
            .operation_id("getCurrentUser")
            .response(200, "Current user profile")
            .response(401, "Authentication required"),
    );

    scope.export::<AuthController>();
    Ok(())
}
