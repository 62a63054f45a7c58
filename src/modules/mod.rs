//! Controller modules compiled into the demo application.
//!
//! Each entry's path is the module's source file relative to `src/`, which
//! is what the discovery patterns are matched against.

use crate::discovery::Manifest;

pub mod auth;

pub fn manifest() -> Manifest {
    Manifest::new().module(
        "modules/auth/controllers/auth_controller.rs",
        auth::controllers::auth_controller::load,
    )
}
