//! Login command implementation.

use hcsync_engine::Session;
use std::path::Path;

/// Runs the login command.
pub async fn run(
    data_dir: &Path,
    username: &str,
    password: &str,
    fcm_token: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new(super::open_context(data_dir)?);
    session.login(username, password, fcm_token).await?;
    println!("Logged in as {username}");
    Ok(())
}
