//! # Rules Subcommand
//!
//! Lists the active suppression rules and allowed coercions, each with the
//! rationale that justifies it.

use std::fmt::Write as _;

use anyhow::Result;
use clap::Args;

use wirecheck_schema::Policy;

use crate::RegistryInputs;

/// Arguments for the rules subcommand.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(flatten)]
    pub registry: RegistryInputs,
}

/// Execute the rules subcommand.
pub fn run_rules(args: &RulesArgs) -> Result<u8> {
    let policy = args.registry.policy()?;
    print!("{}", render_rules(&policy));
    Ok(0)
}

/// Text listing of one policy.
pub fn render_rules(policy: &Policy) -> String {
    let mut out = String::new();
    let rules = policy.suppressions.rules();
    let _ = writeln!(out, "suppressions ({}):", rules.len());
    for rule in rules {
        let _ = writeln!(out, "  {rule}");
        let _ = writeln!(out, "      {}", rule.rationale);
    }
    let coercions = policy.coercions.entries();
    let _ = writeln!(out);
    let _ = writeln!(out, "coercions ({}):", coercions.len());
    for entry in coercions {
        let _ = writeln!(out, "  {entry}");
        let _ = writeln!(out, "      {}", entry.rationale);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "max depth: {}", policy.max_depth);
    out
}
