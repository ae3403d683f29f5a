mod app;

use tracing::error;

fn main() {
    let wiring = app::build_app();
    if let Err(err) = app::run(wiring) {
        error!(error = %err, "sandbox_failed");
        std::process::exit(1);
    }
}
