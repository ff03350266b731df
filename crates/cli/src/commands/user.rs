//! Staff management commands.
//!
//! # Usage
//!
//! ```bash
//! gh-cli user create -e hanako@example.jp -n "山田 花子" -r staff --hire-date 2025-04-01
//! ```

use chrono::NaiveDate;

use grouphome_admin::db::{RoleRepository, UserRepository};
use grouphome_admin::models::user::UserInput;
use grouphome_core::{SystemRole, UserId};

use super::{CommandError, connect};

/// Create a new staff member.
///
/// # Returns
///
/// The ID of the created staff member.
///
/// # Errors
///
/// Returns `CommandError::UnknownRole` for a role that does not exist,
/// `CommandError::Validation` for invalid fields and
/// `CommandError::UserExists` if the email is taken.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    hire_date: Option<NaiveDate>,
) -> Result<UserId, CommandError> {
    let (config, pool) = connect().await?;

    if SystemRole::from_name(role).is_none()
        && RoleRepository::new(&pool).get_by_name(role).await?.is_none()
    {
        return Err(CommandError::UnknownRole(role.to_owned()));
    }

    let input = UserInput {
        name: name.to_owned(),
        email: email.to_owned(),
        role_name: role.to_owned(),
        hire_date,
        retirement_date: None,
        department_histories: None,
    };
    let new_user = input.validate(config.today())?;

    let users = UserRepository::new(&pool);
    if users.get_by_email(&new_user.email).await?.is_some() {
        return Err(CommandError::UserExists(email.to_owned()));
    }

    tracing::info!("Creating staff member: {} ({})", email, role);
    let user = users.create(&new_user).await?;
    tracing::info!(
        "Staff member created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        email,
        role
    );

    Ok(user.id)
}
