//! Interactive prompts using dialoguer

use anyhow::Result;
use dialoguer::Confirm;
use std::path::Path;

/// Prompt user to confirm overwriting prepared data under an artifact root
pub fn confirm_rebuild(root: &Path) -> Result<bool> {
    let message = format!(
        "Prepared data already exists in {}. Rebuild it?",
        root.display()
    );
    Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(Into::into)
}
