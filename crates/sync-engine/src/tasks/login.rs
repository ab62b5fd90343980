use crate::auth_retry::PersistencePolicy;
use crate::cancel::CancelToken;
use crate::context::LibraryContext;
use crate::error::TaskResult;
use lendshelf_core::AccountCredentials;
use lendshelf_network::HttpTransport;
use std::sync::Arc;

/// Verifies `credentials` against the login probe and stores them
///
/// Credentials are persisted only once the server accepted them, so a
/// failed login leaves the stored account untouched. Returns the
/// credentials that worked, which may come from the prompt.
pub async fn login(
    ctx: LibraryContext,
    token: CancelToken,
    credentials: AccountCredentials,
) -> TaskResult<AccountCredentials> {
    let transport: Arc<dyn HttpTransport> = Arc::clone(&ctx.transport);
    let probe = ctx.settings.login_probe().to_string();
    log::info!("Logging in {} against {}", credentials.barcode, probe);

    let outcome = ctx
        .auth_loop(PersistencePolicy::OnSuccess)
        .run(&token, Some(credentials), |auth| {
            let transport = Arc::clone(&transport);
            let probe = probe.clone();
            async move { transport.head(&probe, Some(&auth)).await.map(|_| ()) }
        })
        .await?;

    ctx.credentials.set(&outcome.credentials)?;
    Ok(outcome.credentials)
}
