//! `godel verify`: run every verification task in order.

use anyhow::Result;
use colored::*;

use godel_core::task::{run_verify, VerifyFlagValue, VerifyRequest};
use godel_core::GodelError;

use crate::commands::Launcher;

pub fn verify(launcher: &Launcher, apply: bool, skip: Vec<String>, verify_flags: &[String]) -> Result<()> {
    let request = VerifyRequest {
        apply,
        skip: skip.into_iter().collect(),
        flags: verify_flags
            .iter()
            .map(|f| f.parse::<VerifyFlagValue>())
            .collect::<Result<_, _>>()?,
    };

    let result = run_verify(&launcher.loaded.tasks, &launcher.ctx, &request, |task| {
        println!("{} {}...", "Running".cyan().bold(), task.name);
    });

    if let Err(GodelError::VerifyFailed(failed)) = &result {
        eprintln!("{}", "Failed tasks:".red().bold());
        for name in failed {
            eprintln!("  {}", name);
        }
    }
    Ok(result?)
}
