//! Account profile and unit settings.

use std::sync::Arc;

use petlibro_core::{Account, AccountUpdate, Bridge};

use crate::cli::{AccountArgs, AccountCommand, AccountUpdateArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, or_dash};

fn detail(a: &Arc<Account>) -> String {
    [
        format!("Email:      {}", a.email),
        format!("Nickname:   {}", or_dash(a.nickname.as_deref())),
        format!("ID:         {}", or_dash(a.id.as_deref())),
        format!("Region:     {}", a.region),
        format!("Tier:       {}", or_dash(a.subscription_tier.as_deref())),
        format!("Time zone:  {}", or_dash(a.time_zone.as_deref())),
        format!("Gender:     {}", a.gender),
        format!("Food unit:  {} ({})", a.feed_unit, a.feed_unit.symbol()),
        format!("Water unit: {} ({})", a.water_unit, a.water_unit.symbol()),
        format!("Weight:     {} ({})", a.weight_unit, a.weight_unit.symbol()),
    ]
    .join("\n")
}

impl From<AccountUpdateArgs> for AccountUpdate {
    fn from(args: AccountUpdateArgs) -> Self {
        Self {
            nickname: args.nickname,
            gender: args.gender,
            feed_unit: args.feed_unit,
            water_unit: args.water_unit,
            weight_unit: args.weight_unit,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(bridge: &Bridge, args: AccountArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let account = match args.command {
        AccountCommand::Show => match bridge.account() {
            Some(account) => account,
            None => bridge.refresh_account().await?,
        },
        AccountCommand::Update(update) => {
            let update = AccountUpdate::from(update);
            if update == AccountUpdate::default() {
                return Err(CliError::Validation {
                    field: "account update".into(),
                    reason: "nothing to change; pass at least one option".into(),
                });
            }
            let account = bridge.update_account(&update).await?;
            if !global.quiet {
                eprintln!("Account updated");
            }
            account
        }
    };

    let out = output::render_single(&global.output, &account, detail, |a| a.email.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
