// main.rs - Database server binary
// Kullanım: <port> <default_db_name>

use nosql_document_db::{DatabaseServer, ServerConfig};

fn print_usage(program: &str) {
    eprintln!("Usage: {} <port> <default_db_name>", program);
    eprintln!("Example: {} 4444 mydb", program);
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let port = match args[1].parse::<u16>() {
        Ok(port) => port,
        Err(_) => {
            eprintln!("Invalid port: {}", args[1]);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    };

    let config = ServerConfig {
        port,
        default_database: args[2].clone(),
        ..ServerConfig::default()
    };

    let server = DatabaseServer::new(config);
    if let Err(e) = server.run().await {
        log::error!("Server failed: {}", e);
        std::process::exit(1);
    }
}
