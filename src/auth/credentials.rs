//! Credential management for map API authentication
//!
//! The map API authenticates every request with two custom headers,
//! `username` and `hash_value`. Both values are read from environment
//! variables, which in turn are usually loaded from a .env file in the
//! working directory with owner-only permissions.

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use tracing::debug;

use crate::constants::{auth, env as env_constants};
use crate::errors::{AuthError, AuthResult};

/// Map API credential pair
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    hash_value: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, hash_value: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            hash_value: hash_value.into(),
        }
    }

    /// Load credentials from the environment. Both variables must be set
    /// and non-empty.
    pub fn from_env() -> AuthResult<Self> {
        let username = env::var(env_constants::USERNAME)?;
        let hash_value = env::var(env_constants::HASH_VALUE)?;
        if username.trim().is_empty() || hash_value.trim().is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        Ok(Self {
            username: username.trim().to_string(),
            hash_value: hash_value.trim().to_string(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn hash_value(&self) -> &str {
        &self.hash_value
    }
}

/// Authentication status information
#[derive(Debug, Clone)]
pub struct AuthStatus {
    /// Whether the username environment variable is set
    pub username_set: bool,
    /// Whether the hash value environment variable is set
    pub hash_value_set: bool,
    /// Whether a .env file exists in the current directory
    pub dotenv_file_exists: bool,
    /// Whether credentials have been verified against the API (None = not
    /// tested)
    pub credentials_valid: Option<bool>,
}

impl AuthStatus {
    /// Check if both credentials are available in the environment
    pub fn has_credentials(&self) -> bool {
        self.username_set && self.hash_value_set
    }

    /// Get descriptive status message for display
    pub fn status_message(&self) -> String {
        match (self.has_credentials(), self.credentials_valid) {
            (false, _) => "Missing credentials - run 'auth setup' to configure".to_string(),
            (true, None) => "Credentials configured but not verified".to_string(),
            (true, Some(true)) => "Credentials configured and verified".to_string(),
            (true, Some(false)) => "Credentials configured but invalid".to_string(),
        }
    }
}

/// Check current authentication status
pub fn get_auth_status() -> AuthStatus {
    AuthStatus {
        username_set: env::var(env_constants::USERNAME).is_ok(),
        hash_value_set: env::var(env_constants::HASH_VALUE).is_ok(),
        dotenv_file_exists: Path::new(auth::ENV_FILE).exists(),
        credentials_valid: None,
    }
}

/// Check if credentials exist in environment variables
pub fn check_credentials() -> bool {
    Credentials::from_env().is_ok()
}

/// Prompt user for credentials interactively.
///
/// The hash value is an API token, not a password, but it is still read
/// without echo.
pub fn prompt_credentials() -> AuthResult<Credentials> {
    print!("FCC BDC Username: ");
    io::stdout().flush().map_err(AuthError::CredentialStorage)?;

    let mut username = String::new();
    io::stdin()
        .read_line(&mut username)
        .map_err(AuthError::CredentialStorage)?;
    let username = username.trim().to_string();

    if username.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let hash_value = rpassword::prompt_password("FCC BDC Hash Value: ")
        .map_err(|e| AuthError::CredentialStorage(io::Error::new(io::ErrorKind::Other, e)))?;
    let hash_value = hash_value.trim().to_string();

    if hash_value.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    Ok(Credentials::new(username, hash_value))
}

/// Save credentials to the .env file with secure permissions
pub fn save_credentials(credentials: &Credentials) -> AuthResult<()> {
    write_env_file(Path::new(auth::ENV_FILE), credentials)?;

    // Update the current environment so the running process sees them too
    env::set_var(env_constants::USERNAME, credentials.username());
    env::set_var(env_constants::HASH_VALUE, credentials.hash_value());

    println!("Credentials saved to .env file");

    #[cfg(unix)]
    println!("File permissions set to owner-only (600)");

    #[cfg(not(unix))]
    println!(
        "Warning: File permissions not set (non-Unix system). Please ensure .env file is protected."
    );

    Ok(())
}

/// Merge the credential lines into an existing .env file, preserving
/// unrelated entries
fn write_env_file(env_path: &Path, credentials: &Credentials) -> AuthResult<()> {
    let mut lines = Vec::new();
    let mut username_found = false;
    let mut hash_found = false;

    if env_path.exists() {
        let file = File::open(env_path)?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            let trimmed = line.trim();

            if trimmed.starts_with(&format!("{}=", env_constants::USERNAME)) {
                lines.push(format!("{}={}", env_constants::USERNAME, credentials.username()));
                username_found = true;
            } else if trimmed.starts_with(&format!("{}=", env_constants::HASH_VALUE)) {
                lines.push(format!(
                    "{}={}",
                    env_constants::HASH_VALUE,
                    credentials.hash_value()
                ));
                hash_found = true;
            } else {
                lines.push(line);
            }
        }
    }

    if !username_found {
        lines.push(format!("{}={}", env_constants::USERNAME, credentials.username()));
    }
    if !hash_found {
        lines.push(format!(
            "{}={}",
            env_constants::HASH_VALUE,
            credentials.hash_value()
        ));
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(env_path)?;

    for line in lines {
        writeln!(file, "{}", line)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata()?.permissions();
        perms.set_mode(auth::ENV_FILE_PERMISSIONS);
        file.set_permissions(perms)?;
    }

    debug!(path = %env_path.display(), "wrote credential file");
    Ok(())
}

/// Remove the credential lines from the .env file and the current
/// environment
pub fn clear_credentials() -> AuthResult<()> {
    let env_path = Path::new(auth::ENV_FILE);

    if env_path.exists() {
        let file = File::open(env_path)?;
        let kept: Vec<String> = BufReader::new(file)
            .lines()
            .collect::<io::Result<Vec<_>>>()?
            .into_iter()
            .filter(|line| {
                let trimmed = line.trim();
                !trimmed.starts_with(&format!("{}=", env_constants::USERNAME))
                    && !trimmed.starts_with(&format!("{}=", env_constants::HASH_VALUE))
            })
            .collect();

        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(env_path)?;
        for line in kept {
            writeln!(file, "{}", line)?;
        }
    }

    env::remove_var(env_constants::USERNAME);
    env::remove_var(env_constants::HASH_VALUE);

    println!("Credentials cleared");
    Ok(())
}

/// Verify credentials by querying the map API's date listing
pub async fn verify_credentials() -> AuthResult<bool> {
    let credentials = Credentials::from_env().map_err(|_| AuthError::MissingCredentials)?;

    println!("Verifying credentials with the map API...");

    let client = match crate::app::BdcClient::new(&credentials) {
        Ok(client) => client,
        Err(e) => {
            println!("Could not build API client: {}", e);
            return Ok(false);
        }
    };

    match client.list_as_of_dates().await {
        Ok(_) => {
            println!("Credentials verified successfully!");
            Ok(true)
        }
        Err(e) => {
            println!("Credential verification failed: {}", e);
            Ok(false)
        }
    }
}

/// Interactive credential setup workflow
pub async fn setup_credentials() -> AuthResult<()> {
    println!("FCC BDC Authentication Setup");
    println!("============================");
    println!();
    println!("This will configure the credentials used to query the National");
    println!("Broadband Map download service. Your username and hash value are");
    println!("shown on your FCC BDC account page, and will be stored in a .env");
    println!("file in the current directory.");
    println!();

    let status = get_auth_status();
    if status.has_credentials() {
        println!("Warning: Credentials are already configured.");
        print!("Do you want to update them? [y/N]: ");
        io::stdout().flush().map_err(AuthError::CredentialStorage)?;

        let mut response = String::new();
        io::stdin()
            .read_line(&mut response)
            .map_err(AuthError::CredentialStorage)?;

        if !response.trim().to_lowercase().starts_with('y') {
            println!("Setup cancelled.");
            return Ok(());
        }
        println!();
    }

    let credentials = prompt_credentials()?;

    println!();
    println!("Saving credentials...");
    save_credentials(&credentials)?;

    println!();
    let is_valid = verify_credentials().await?;

    if is_valid {
        println!();
        println!("Setup complete! You can now use the download commands.");
    } else {
        println!();
        println!("Setup saved but verification failed. Check your username and");
        println!("hash value, then run 'auth setup' again if needed.");
    }

    Ok(())
}

/// Show current authentication status
pub async fn show_auth_status() -> AuthResult<()> {
    let mut status = get_auth_status();

    println!("FCC BDC Authentication Status");
    println!("=============================");
    println!();

    if let Ok(username) = env::var(env_constants::USERNAME) {
        println!("Username: {} (set)", username);
    } else {
        println!("Username: Not set");
    }

    println!(
        "Hash value: {}",
        if status.hash_value_set {
            "Set"
        } else {
            "Not set"
        }
    );

    println!(
        ".env file: {}",
        if status.dotenv_file_exists {
            "Exists"
        } else {
            "Not found"
        }
    );

    println!();

    if status.has_credentials() {
        println!("Testing credentials...");
        let is_valid = verify_credentials().await?;
        status.credentials_valid = Some(is_valid);
        println!();
    }

    println!("Status: {}", status.status_message());

    if !status.has_credentials() {
        println!();
        println!("Run 'bdc_fetcher auth setup' to configure credentials.");
    }

    Ok(())
}
