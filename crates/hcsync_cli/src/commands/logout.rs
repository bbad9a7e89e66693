//! Logout command implementation.

use hcsync_engine::Session;
use std::path::Path;

/// Runs the logout command.
pub async fn run(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new(super::open_context(data_dir)?);
    if !session.is_logged_in()? {
        println!("Not logged in");
        return Ok(());
    }
    session.logout().await?;
    println!("Logged out");
    Ok(())
}
