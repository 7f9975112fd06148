use std::io;

use tokio::process::{Child, Command};

use crate::constants::{SPAWN_ATTEMPTS, SPAWN_RETRY_DELAY};

/// Spawns `command`, waiting briefly while the executable is still open for
/// writing (ETXTBSY). A program executed right after it was written hits this
/// whenever another thread forks in between.
pub async fn spawn(command: &mut Command) -> io::Result<Child> {
    let mut attempt = 1;
    loop {
        match command.spawn() {
            Err(e) if e.kind() == io::ErrorKind::ExecutableFileBusy && attempt < SPAWN_ATTEMPTS => {
                tracing::debug!("Executable busy on attempt {}, retrying", attempt);
                attempt += 1;
                tokio::time::sleep(SPAWN_RETRY_DELAY).await;
            }
            result => return result,
        }
    }
}
