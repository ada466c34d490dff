use devserve::server::{ctrl_c, StaticServer};
use devserve::ServerConfig;
use dotenv::dotenv;
use env_logger::init;
use std::process;

#[tokio::main]
async fn main() {
    // Load .env file
    dotenv().ok();

    // Setup logging
    init();

    let server = match StaticServer::bind(ServerConfig::plain()).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    println!("Server running at {}", server.display_url());
    println!("Serving files from: {}", server.root().display());
    println!("Press Ctrl+C to stop");

    if let Err(e) = server.run_until(ctrl_c()).await {
        eprintln!("{}", e);
        process::exit(1);
    }

    println!("\nServer stopped.");
}
