use std::path::Path;

use anyhow::Context;
use solana_keypair::Keypair;
use solana_sdk::bs58;

pub const KEYPAIR_ENV_VAR: &str = "JOURNAL_KEYPAIR";

/// Parses a keypair from either a JSON byte array or a base58 string.
pub fn parse_keypair(kp_str: &str) -> anyhow::Result<Keypair> {
    let kp_str = kp_str.trim();
    let byte_vec: Vec<u8> = if kp_str.starts_with('[') {
        serde_json::from_str(kp_str).context("Invalid JSON keypair")?
    } else {
        bs58::decode(kp_str)
            .into_vec()
            .context("Invalid base58 keypair")?
    };

    Keypair::try_from(byte_vec.as_slice()).context("Invalid keypair bytes")
}

/// Reads a keypair file in the JSON byte array format the Solana CLI writes.
pub fn read_keypair_file(path: &Path) -> anyhow::Result<Keypair> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Couldn't read keypair file {}", path.display()))?;
    parse_keypair(&contents).with_context(|| format!("Invalid keypair file {}", path.display()))
}

/// The signer's keypair: `--keypair <file>` if passed, otherwise the [`KEYPAIR_ENV_VAR`]
/// environment variable. `None` if neither is set.
pub fn signer_keypair(path: Option<&Path>) -> anyhow::Result<Option<Keypair>> {
    if let Some(path) = path {
        return read_keypair_file(path).map(Some);
    }

    match std::env::var(KEYPAIR_ENV_VAR) {
        Ok(kp_str) => parse_keypair(&kp_str)
            .with_context(|| format!("Environment variable {KEYPAIR_ENV_VAR} is invalid"))
            .map(Some),
        Err(_) => Ok(None),
    }
}
