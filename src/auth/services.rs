use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo_types::User;
use crate::config::BootstrapAdmin;
use crate::error::{ServiceError, ServiceResult};
use crate::state::AppState;

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

pub async fn find_user(st: &AppState, username: &str) -> ServiceResult<Option<User>> {
    Ok(st.store.find_user_by_username(username.trim()).await?)
}

/// Checks the password and stamps the login time on success.
pub async fn authenticate(st: &AppState, user: &User, password: &str) -> ServiceResult<bool> {
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, username = %user.username, "login invalid password");
        return Ok(false);
    }
    st.store.record_login(user.id, st.calendar.now()).await?;
    info!(user_id = user.id, role = %user.role, "user logged in");
    Ok(true)
}

/// Validates a candidate username for the add-user chain.
pub async fn check_new_username(st: &AppState, username: &str) -> ServiceResult<()> {
    if !is_valid_username(username) {
        return Err(ServiceError::invalid(
            "Usernames are 3-32 characters of letters, digits, '.', '_' or '-'. Please enter a different username:",
        ));
    }
    if st.store.find_user_by_username(username).await?.is_some() {
        return Err(ServiceError::invalid(format!(
            "Error: User with username {username} already exists. Please enter a different username:"
        )));
    }
    Ok(())
}

pub async fn add_user(
    st: &AppState,
    username: &str,
    password: &str,
    role_name: &str,
) -> ServiceResult<User> {
    check_new_username(st, username).await?;
    let role = match st.store.find_role_by_name(role_name).await? {
        Some(r) => r,
        None => {
            let names = role_names(st).await?;
            return Err(ServiceError::invalid(format!(
                "Error: Role {role_name} does not exist. Available roles: {names}. Please enter a valid role:"
            )));
        }
    };
    let hash = hash_password(password)?;
    let user = st.store.create_user(username, &hash, role.id).await?;
    info!(user_id = user.id, username = %user.username, role = %user.role, "user created");
    Ok(user)
}

pub async fn role_names(st: &AppState) -> ServiceResult<String> {
    let roles = st.store.list_roles().await?;
    Ok(roles
        .into_iter()
        .map(|r| r.name)
        .collect::<Vec<_>>()
        .join(", "))
}

pub async fn logout(st: &AppState, user: &User) -> ServiceResult<()> {
    st.store.record_logout(user.id, st.calendar.now()).await?;
    info!(user_id = user.id, "user logged out");
    Ok(())
}

/// Creates the configured admin account if it does not exist yet.
pub async fn ensure_bootstrap_admin(st: &AppState, admin: &BootstrapAdmin) -> anyhow::Result<()> {
    if st.store.find_user_by_username(&admin.username).await?.is_some() {
        return Ok(());
    }
    let role = st
        .store
        .find_role_by_name("Admin")
        .await?
        .ok_or_else(|| anyhow::anyhow!("Admin role is missing from the store"))?;
    let hash = hash_password(&admin.password)?;
    let user = st.store.create_user(&admin.username, &hash, role.id).await?;
    info!(user_id = user.id, username = %user.username, "bootstrap admin created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(is_valid_username("asha.k"));
        assert!(is_valid_username("chef_01"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("has space"));
    }

    #[tokio::test]
    async fn add_user_then_authenticate() {
        let st = AppState::fake();
        let user = add_user(&st, "ravi", "pa55word", "Employee").await.unwrap();
        assert_eq!(user.role, "Employee");

        let found = find_user(&st, "ravi").await.unwrap().expect("user exists");
        assert!(authenticate(&st, &found, "pa55word").await.unwrap());
        assert!(!authenticate(&st, &found, "nope").await.unwrap());

        let after = find_user(&st, "ravi").await.unwrap().unwrap();
        assert!(after.last_login_time.is_some());
    }

    #[tokio::test]
    async fn add_user_rejects_duplicates_and_unknown_roles() {
        let st = AppState::fake();
        add_user(&st, "meera", "secret", "Chef").await.unwrap();

        let dup = add_user(&st, "meera", "secret", "Chef").await.unwrap_err();
        assert!(matches!(dup, ServiceError::Invalid(_)));

        let err = add_user(&st, "karan", "secret", "Janitor").await.unwrap_err();
        assert!(err.to_string().contains("Available roles: Admin, Chef, Employee"));
    }

    #[tokio::test]
    async fn bootstrap_admin_is_idempotent() {
        let st = AppState::fake();
        let admin = BootstrapAdmin {
            username: "root".into(),
            password: "toor".into(),
        };
        ensure_bootstrap_admin(&st, &admin).await.unwrap();
        ensure_bootstrap_admin(&st, &admin).await.unwrap();
        let user = find_user(&st, "root").await.unwrap().unwrap();
        assert_eq!(user.role, "Admin");
    }
}
