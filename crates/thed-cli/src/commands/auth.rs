//! Sign-in, sign-out and onboarding.

use thed_core::{LocalStore, PROFILE_CATEGORIES};

use super::{open_session, CmdResult};

pub fn login(email: &str) -> CmdResult {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(format!("not an email address: '{email}'").into());
    }
    let store = LocalStore::open()?;
    let session = store.sign_in(email)?;
    println!("Signed in as {} ({})", session.email, session.user_id);
    Ok(())
}

pub fn logout() -> CmdResult {
    LocalStore::open()?.sign_out()?;
    println!("Signed out");
    Ok(())
}

pub async fn onboard(name: &str, categories: &[String]) -> CmdResult {
    let session = open_session().await?;
    let controller = session.controller();
    let mut c = controller.lock().await;
    if !c.complete_onboarding(name, categories).await? {
        return Err(format!(
            "onboarding needs a name and one or two of: {}",
            PROFILE_CATEGORIES.join(", ")
        )
        .into());
    }
    let user = c.user();
    println!(
        "Welcome, {}! Interests: {}",
        user.name.as_deref().unwrap_or(&user.email),
        user.tags.join(", ")
    );
    Ok(())
}
