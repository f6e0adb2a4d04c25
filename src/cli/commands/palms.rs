use crate::cli::parser::PalmsAction;
use crate::config::Config;
use crate::core::FieldSync;
use crate::errors::AppResult;
use crate::ui::messages::{info, success, warning};
use std::io::Write;

pub async fn handle(action: &PalmsAction, cfg: &Config) -> AppResult<()> {
    let app = FieldSync::from_config(cfg)?;

    match action {
        PalmsAction::Refresh => {
            let loaded = app
                .palms
                .refresh(|loaded, total| {
                    print!("\r⏳ {}/{} palms", loaded, total);
                    let _ = std::io::stdout().flush();
                })
                .await?;
            println!();
            success(format!("{} palm(s) cached", loaded));
        }

        PalmsAction::Show { qr_code } => match app.palms.lookup_or_fetch(qr_code).await? {
            Some(palm) => {
                println!("🌴 {}", palm.qr_code);
                println!("   id       : {}", palm.id);
                println!("   block    : {} {}", palm.block_code, palm.block_name);
                if let (Some(r), Some(c)) = (palm.row_number, palm.column_number) {
                    println!("   position : row {} col {}", r, c);
                }
                if let Some(v) = &palm.variety {
                    println!("   variety  : {}", v);
                }
                println!("   status   : {}", palm.status);
            }
            None => warning(format!("Palm {} not found", qr_code)),
        },

        PalmsAction::Clear => {
            let removed = app.palms.clear()?;
            info(format!("Removed {} cached palm(s)", removed));
        }
    }

    Ok(())
}
