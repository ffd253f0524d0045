use crate::cli::actions::{Action, server};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions. To add a new action, add an
// `Action::*` variant and a corresponding `*::execute` call here.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
    }
}
