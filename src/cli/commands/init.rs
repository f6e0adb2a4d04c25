use crate::cli::parser::Cli;
use crate::config::Config;
use crate::db::LocalStore;
use crate::errors::AppResult;
use crate::ui::messages::warning;

/// Handle the `init` command
///
/// Creates the configuration file (skipped in test mode) and the local
/// store with every migration applied.
pub fn handle(cli: &Cli) -> AppResult<()> {
    let cfg = Config::init_all(cli.db.clone(), cli.test)?;
    let db_path = cfg.database_path();

    println!("⚙️  Initializing fieldsync…");
    if !cli.test {
        println!("📄 Config file : {}", Config::config_file().display());
    }
    println!("🗄️  Database   : {}", db_path.display());

    let store = LocalStore::open(&db_path)?;

    if let Err(e) = store.write(|tx| {
        tx.log(
            "init",
            "store",
            &format!("Local store initialized at {}", db_path.display()),
        )
    }) {
        warning(format!("Failed to write internal log: {}", e));
    }

    println!("✅ Local store initialized at {}", db_path.display());
    Ok(())
}
