/// Entry point for the container housekeeper.
///
/// Tracks every cgroup on the host, keeps a bounded stats history per container
/// and logs discovery and collection events.
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., invalid configuration or an
/// unreadable procfs).
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info HISTORY_DURATION=120 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    container_housekeeper::run().await
}
