use crate::config::Config;
use crate::core::log::LogLogic;
use crate::db::LocalStore;
use crate::errors::AppResult;

pub fn handle(print: bool, cfg: &Config) -> AppResult<()> {
    if print {
        let store = LocalStore::open(cfg.database_path())?;
        LogLogic::print_log(&store)?;
    }

    Ok(())
}
