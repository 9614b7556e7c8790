use std::net::IpAddr;

use crate::client::{CliError, CliResult, CommandContext};
use crate::registry::ParsedArgs;

pub(crate) async fn handle_rdns(ctx: &mut CommandContext<'_>, args: &ParsedArgs) -> CliResult<()> {
    let address: IpAddr = args.parse("ip")?;
    let ptr = args.optional("ptr");
    let delete = args.flag("delete");
    if delete && ptr.is_some() {
        return Err(CliError::usage("--delete does not take a PTR value"));
    }

    let robot = ctx.robot()?;
    if delete {
        robot
            .delete_reverse_dns(address)
            .await
            .map_err(|err| CliError::robot(err, format!("removing the PTR record of {address}")))?;
        return ctx.out.line(format!("{address}: PTR record removed"));
    }

    let record = match ptr {
        Some(ptr) => robot
            .set_reverse_dns(address, ptr)
            .await
            .map_err(|err| CliError::robot(err, format!("setting the PTR record of {address}")))?,
        None => robot
            .get_reverse_dns(address)
            .await
            .map_err(|err| CliError::robot(err, format!("reading the PTR record of {address}")))?,
    };
    ctx.out.line(format!("{} -> {}", record.ip, record.ptr))
}
