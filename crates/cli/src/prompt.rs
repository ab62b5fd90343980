//! Interactive credential prompt

use async_trait::async_trait;
use console::{style, Term};
use lendshelf_core::AccountCredentials;
use lendshelf_sync_engine::CredentialPrompt;

/// Asks for a new barcode and PIN on the terminal
///
/// Gives up when stderr is not a terminal or the patron enters an empty PIN.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

#[async_trait]
impl CredentialPrompt for TerminalPrompt {
    async fn request_credentials(
        &self,
        rejected: Option<&AccountCredentials>,
    ) -> Option<AccountCredentials> {
        let previous = rejected.map(|credentials| credentials.barcode.clone());
        tokio::task::spawn_blocking(move || read_credentials(previous))
            .await
            .ok()
            .flatten()
    }
}

fn read_credentials(previous: Option<String>) -> Option<AccountCredentials> {
    let term = Term::stderr();
    if !term.is_term() {
        return None;
    }

    term.write_line(&format!(
        "{} The library did not accept these credentials.",
        style("!").yellow().bold()
    ))
    .ok()?;

    let barcode = match &previous {
        Some(previous) => {
            term.write_str(&format!("Barcode [{}]: ", previous)).ok()?;
            let entered = term.read_line().ok()?;
            choose_barcode(&entered, Some(previous.as_str()))?
        }
        None => {
            term.write_str("Barcode: ").ok()?;
            let entered = term.read_line().ok()?;
            choose_barcode(&entered, None)?
        }
    };

    let pin = read_pin(&term)?;
    Some(AccountCredentials::new(barcode, pin))
}

/// Reads a PIN without echo; `None` when empty or unreadable
pub fn read_pin(term: &Term) -> Option<String> {
    term.write_str("PIN: ").ok()?;
    let pin = term.read_secure_line().ok()?;
    if pin.is_empty() {
        None
    } else {
        Some(pin)
    }
}

/// The entered barcode, or the previous one when the input is blank
pub fn choose_barcode(entered: &str, previous: Option<&str>) -> Option<String> {
    let entered = entered.trim();
    if !entered.is_empty() {
        Some(entered.to_string())
    } else {
        previous.map(str::to_string)
    }
}
