use async_trait::async_trait;

use crate::application::messaging::DispatchContext;

/// Command handler - the body of a command, opaque to the router
///
/// Handlers own their failures: they report problems to the user through
/// `ctx.reply` and never hand errors back to the router.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &DispatchContext);
}
