//! Domain layer - Core business entities and logic
//!
//! This module contains the core domain models that represent
//! business concepts independent of infrastructure concerns.

pub mod credentials;
pub mod password;
pub mod session;
pub mod user;

pub use credentials::{ChangePassword, OneTimeCode, ResetPassword};
pub use password::Password;
pub use session::AuthContext;
pub use user::{
    CreateUser, DropdownOption, NewUser, ProfileChanges, UpdateProfile, UpdateUser, User,
    UserResponse,
};
