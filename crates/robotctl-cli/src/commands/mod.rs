//! Command handlers grouped by concern.

pub(crate) mod admin;
pub(crate) mod config;
pub(crate) mod failover;
pub(crate) mod rdns;
pub(crate) mod rescue;
pub(crate) mod servers;
pub(crate) mod vlan;

use crate::client::{CliResult, CommandContext};
use crate::registry::{CommandKind, ParsedArgs};

/// Route a parsed invocation to its handler.
pub(crate) async fn execute(
    kind: CommandKind,
    ctx: &mut CommandContext<'_>,
    args: &ParsedArgs,
) -> CliResult<()> {
    match kind {
        CommandKind::List => servers::handle_list(ctx).await,
        CommandKind::Show => servers::handle_show(ctx, args).await,
        CommandKind::Reboot => servers::handle_reboot(ctx, args).await,
        CommandKind::SetName => servers::handle_setname(ctx, args).await,
        CommandKind::Rescue => rescue::handle_rescue(ctx, args).await,
        CommandKind::ReverseDns => rdns::handle_rdns(ctx, args).await,
        CommandKind::Failover => failover::handle_failover(ctx, args).await,
        CommandKind::Vlan => vlan::handle_vlan(ctx).await,
        CommandKind::Admin => admin::handle_admin(ctx, args).await,
        CommandKind::Login => config::handle_login(ctx, args),
        CommandKind::Config => config::handle_config(ctx, args),
    }
}
