//! `fan-profile` subcommand.

use super::{Result, Stack};

pub(super) fn cmd_fan_profile(stack: &Stack, profile: &str) -> Result<()> {
    stack.run(|s| s.set_fan_profile(profile))?;
    println!("Fan profile: {profile}");
    Ok(())
}
