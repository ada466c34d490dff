use devserve::server::{ctrl_c, StaticServer};
use devserve::{CertParams, ServerConfig};
use dotenv::dotenv;
use env_logger::init;
use std::{io, process};

#[tokio::main]
async fn main() {
    // Load .env file
    dotenv().ok();

    // Setup logging
    init();

    let config = match ServerConfig::tls().resolved() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    // The server never starts without a usable credential pair
    if let Err(e) = config
        .tls_files()
        .ensure(&CertParams::default(), &mut io::stdout())
    {
        log::error!("{}", e);
        println!("Failed to generate certificate: {}", e);
        process::exit(1);
    }

    let server = match StaticServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    println!("HTTPS server running at {}", server.display_url());
    println!("Files served from: {}", server.root().display());
    println!("Press Ctrl+C to stop");

    if let Err(e) = server.run_until(ctrl_c()).await {
        eprintln!("{}", e);
        process::exit(1);
    }

    println!("\nServer stopped.");
}
