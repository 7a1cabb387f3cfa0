use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets (TKT_WEBHOOK_SECRET, TKT_PROVIDER_SECRET_KEY) are deliberately left off this list
    const DISPLAY_ENVS: [&str; 17] = [
        "RUST_LOG",
        "TKT_HOST",
        "TKT_PORT",
        "TKT_DATABASE_URL",
        "TKT_USE_X_FORWARDED_FOR",
        "TKT_USE_FORWARDED",
        "TKT_IDENTITY_HEADER",
        "TKT_PROVIDER_API_URL",
        "TKT_PROVIDER_TIMEOUT_MS",
        "TKT_WEBHOOK_HMAC_HEADER",
        "TKT_WEBHOOK_HMAC_CHECKS",
        "TKT_WEBHOOK_IP_WHITELIST",
        "TKT_CURRENCY",
        "TKT_DUPLICATE_WINDOW_MINUTES",
        "TKT_INVENTORY_MODE",
        "TKT_SUCCESS_STATUSES",
        "TKT_MAX_QUANTITY",
    ];
    const RETRY_ENVS: [&str; 2] = ["TKT_SETTLEMENT_MAX_ATTEMPTS", "TKT_SETTLEMENT_RETRY_DELAY_MS"];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().chain(RETRY_ENVS.iter()).for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
