//! CLI Doctor Command
//!
//! Offline diagnosis of the local installation: the external CLI binary,
//! environment overrides, and the log directory.

use anyhow::Result;

use cligate_invoker::CliInvoker;

use crate::config::Config;

pub async fn run(config: &Config) -> Result<()> {
    println!("\n🔍 Running cligate doctor...\n");

    let cli_ok = check_cli(config).await;
    let env_ok = check_env_vars();
    let logs_ok = check_log_dir(&config.log_dir);

    println!();
    if cli_ok && env_ok && logs_ok {
        println!("✅ All checks passed.");
    } else {
        println!("❌ Some checks failed. Fix the errors above before serving.");
    }

    Ok(())
}

async fn check_cli(config: &Config) -> bool {
    println!("Checking external CLI ({}):", config.cli_command);

    let invoker = CliInvoker::new(config.invoker_config());
    match invoker.probe().await {
        Ok(version) => {
            println!("  🟢 responds to --version ({version})");
            true
        }
        Err(e) => {
            println!("  🔴 probe failed: {e}");
            false
        }
    }
}

fn check_env_vars() -> bool {
    println!("Checking environment overrides:");

    let vars = [
        "CLIGATE_CLI_BIN",
        "CLIGATE_CLI_TIMEOUT_SECS",
        "CLIGATE_PORT",
        "CLIGATE_SESSION_TTL_SECS",
    ];

    for var in vars {
        match std::env::var(var) {
            Ok(val) if !val.is_empty() => println!("  🟢 {var}={val}"),
            _ => println!("  🟡 {var} not set (using default)"),
        }
    }

    // Every override is optional; this check is informational.
    true
}

fn check_log_dir(dir: &str) -> bool {
    println!("Checking log directory ({dir}):");

    match std::fs::create_dir_all(dir) {
        Ok(()) => {
            println!("  🟢 writable");
            true
        }
        Err(e) => {
            println!("  🔴 cannot create: {e}");
            false
        }
    }
}
