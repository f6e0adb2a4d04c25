//! fieldsync main entrypoint.

use fieldsync::run;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        fieldsync::ui::messages::error(format!("Error: {}", e));
        std::process::exit(1);
    }
}
