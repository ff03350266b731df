//! Seed the reference data a fresh database needs.
//!
//! Inserts or refreshes the system roles, creates departments and adds a
//! staff row for the demo admin so demo sessions can be attached to a user.
//! Safe to run repeatedly.

use grouphome_admin::db::{DepartmentRepository, RoleRepository, UserRepository};
use grouphome_admin::models::user::UserInput;
use grouphome_core::{Email, SystemRole};
use tracing::info;

use super::{CommandError, connect};

/// Departments created when none are given on the command line.
pub const DEFAULT_DEPARTMENTS: &[&str] = &["本部", "生活支援", "夜間支援"];

/// Seed roles, departments and the demo admin.
///
/// # Errors
///
/// Returns an error if configuration is missing or a write fails.
pub async fn run(departments: &[String]) -> Result<(), CommandError> {
    let (config, pool) = connect().await?;

    let roles = RoleRepository::new(&pool);
    for role in SystemRole::ALL {
        roles.upsert_system(role).await?;
        info!(role = role.as_str(), "System role ready");
    }

    let repo = DepartmentRepository::new(&pool);
    let names: Vec<&str> = if departments.is_empty() {
        DEFAULT_DEPARTMENTS.to_vec()
    } else {
        departments.iter().map(String::as_str).collect()
    };
    for name in names {
        repo.ensure(name).await?;
        info!(department = name, "Department ready");
    }

    let users = UserRepository::new(&pool);
    let email = Email::parse(&config.demo.email)
        .map_err(|e| CommandError::Validation(("email", e.to_string()).into()))?;
    if let Some(user) = users.get_by_email(&email).await? {
        info!(user_id = %user.id, "Demo admin already exists");
    } else {
        let input = UserInput {
            name: config.demo.name.clone(),
            email: config.demo.email.clone(),
            role_name: SystemRole::Admin.as_str().to_owned(),
            hire_date: None,
            retirement_date: None,
            department_histories: None,
        };
        let user = users.create(&input.validate(config.today())?).await?;
        info!(
            user_id = %user.id,
            "Demo admin created; set DEMO_ADMIN_USER_ID={} to attach demo sessions",
            user.id
        );
    }

    info!("Seeding complete!");
    Ok(())
}
