use convenios_api::domain::entity::siconv;
use convenios_api::domain::query::siconv as methods;
use convenios_api::storage::postgres::PostgresStore;
use convenios_api::storage::RecordStore;
use convenios_api::Settings;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight\n\
         \n\
         Checks the catalog wiring, database connectivity and that every\n\
         table and column the catalog reads exists in the current schema.\n\
         \n\
         Requires env vars:\n\
           DATABASE_URL (PUBLIC_BASE_URL, DB_MAX_CONNECTIONS optional)\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }

    let settings = Settings::from_env()?;

    println!("> Preflight:");
    println!("  PUBLIC_BASE_URL={}", settings.public_base_url);
    println!("  BIND_ADDR={}", settings.bind_addr);

    let catalog = siconv::catalog()?;
    let registry = methods::registry(&catalog)?;
    println!(
        "> Catalog OK: {} entities, {} query methods",
        catalog.names().len(),
        registry.len()
    );

    let store = PostgresStore::connect(&settings.database_url, 1).await?;
    store.ping().await?;
    println!("> Database reachable");

    let missing = store.missing_schema_objects(&catalog).await?;
    if missing.is_empty() {
        println!("> Schema OK: every catalog table and column exists");
        return Ok(());
    }
    eprintln!("> Schema check failed, missing:");
    for item in &missing {
        eprintln!("  - {}", item);
    }
    anyhow::bail!("{} schema objects missing", missing.len())
}
