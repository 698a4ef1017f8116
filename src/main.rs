//! Clubhub Backend - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    clubhub_backend::run().await;
}
