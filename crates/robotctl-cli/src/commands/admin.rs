use std::fmt::{self, Display, Formatter};
use std::net::IpAddr;
use std::str::FromStr;

use crate::client::{CliError, CliResult, CommandContext};
use crate::commands::servers::lookup;
use crate::output::admin_lines;
use crate::registry::ParsedArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdminAction {
    Show,
    Create,
    Delete,
}

impl FromStr for AdminAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "show" => Ok(Self::Show),
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown admin action '{other}'")),
        }
    }
}

impl Display for AdminAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Show => "show",
            Self::Create => "create",
            Self::Delete => "delete",
        })
    }
}

pub(crate) async fn handle_admin(ctx: &mut CommandContext<'_>, args: &ParsedArgs) -> CliResult<()> {
    let address: IpAddr = args.parse("ip")?;
    let action: AdminAction = args.parse("action")?;
    let password = args.optional("password");
    if password.is_some() && action != AdminAction::Create {
        return Err(CliError::usage(format!(
            "--password is only valid with --action create, not {action}"
        )));
    }

    let robot = ctx.robot()?;
    let server = lookup(robot.as_ref(), address).await?;
    let id = server.server_number;
    let context = format!("{action} admin account of {address}");

    match action {
        AdminAction::Delete => {
            robot
                .delete_admin_account(id)
                .await
                .map_err(|err| CliError::robot(err, context))?;
            ctx.out.line(format!("{address}: admin account removed"))
        }
        AdminAction::Create | AdminAction::Show => {
            let account = if action == AdminAction::Create {
                robot.create_admin_account(id, password).await
            } else {
                robot.get_admin_account(id).await
            }
            .map_err(|err| CliError::robot(err, context))?;
            for line in admin_lines(&account) {
                ctx.out.line(line)?;
            }
            Ok(())
        }
    }
}
