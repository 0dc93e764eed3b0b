//! Reading secrets from stdin for the credential commands

use crate::error::AppError;
use tokio::io::{self, AsyncBufReadExt};

/// Prompts for the scraping password and returns the line read from stdin,
/// without the trailing newline.
///
/// Surrounding spaces are kept since they may be part of the password.
pub async fn prompt_for_password(username: &str) -> Result<String, AppError> {
    println!("Password for {username}: ");
    let mut input = String::new();
    let stdin = io::stdin();
    let mut reader = io::BufReader::new(stdin);
    reader.read_line(&mut input).await?;
    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(AppError::config_error("Password cannot be empty"));
    }
    Ok(password)
}
