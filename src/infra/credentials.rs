use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::app::ports::Credentials;
use crate::error::{ListerError, Result};
use crate::infra::opensea::Wallet;

pub const PASSWORD_ENV: &str = "LISTER_WALLET_PASSWORD";
pub const RECOVERY_PHRASE_ENV: &str = "LISTER_RECOVERY_PHRASE";

/// Resolves wallet credentials from the environment, falling back to
/// `{assets_dir}/{prefix}_password.txt` and `{prefix}_recovery_phrase.txt`.
pub fn resolve(wallet: Wallet, assets_dir: &Path) -> Result<Credentials> {
    Ok(Credentials {
        password: lookup(PASSWORD_ENV, assets_dir, wallet, "password")?,
        recovery_phrase: lookup(RECOVERY_PHRASE_ENV, assets_dir, wallet, "recovery_phrase")?,
    })
}

fn lookup(var: &str, assets_dir: &Path, wallet: Wallet, kind: &str) -> Result<String> {
    if let Ok(value) = env::var(var) {
        if !value.trim().is_empty() {
            debug!(source = var, "Credential taken from environment");
            return Ok(value.trim().to_string());
        }
    }

    let path = assets_dir.join(format!("{}_{}.txt", wallet.file_prefix(), kind));
    match fs::read_to_string(&path) {
        Ok(text) if !text.trim().is_empty() => {
            debug!(source = %path.display(), "Credential taken from file");
            Ok(text.trim().to_string())
        }
        _ => Err(ListerError::MissingCredential(format!(
            "{} {}: set {} or write it to {}",
            wallet.display_name(),
            kind.replace('_', " "),
            var,
            path.display()
        ))),
    }
}
